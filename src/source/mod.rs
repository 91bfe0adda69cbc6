// src/source/mod.rs

use async_trait::async_trait;

use crate::error::Result;

pub mod memory;
pub mod sheets;

pub use memory::MemorySource;
pub use sheets::{Credential, SheetsClient};

/// Range holding the song catalog (Song/Title, Artist, Genre, Year).
pub const CATALOG_RANGE: &str = "SetList!A:D";
/// Range holding submitted requests (Timestamp, Song Title, Requested By, Status).
pub const REQUESTS_RANGE: &str = "Requests!A:D";

/// A remote store of rows addressed by range id.
///
/// `get` returns the whole range, first row being the header row. Rows may be
/// shorter than the header; callers treat missing trailing cells as empty.
/// `append` adds one row after the last populated row of the range, cells in
/// the range's header order.
#[async_trait]
pub trait TabularSource: Send + Sync {
    async fn get(&self, range: &str) -> Result<Vec<Vec<String>>>;

    async fn append(&self, range: &str, row: Vec<String>) -> Result<()>;
}
