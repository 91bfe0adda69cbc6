// src/catalog.rs

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, RwLock},
};
use tracing::{info, instrument, warn};

use crate::{
    error::Result,
    schema::{ColumnMap, CATALOG_LAYOUT},
    source::TabularSource,
};

/// One song of the set list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    /// Position among the data rows of the load that produced this record.
    pub id: usize,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub year: String,
    /// Columns beyond the declared ones, keyed by lower-cased header.
    pub extra: BTreeMap<String, String>,
}

/// Records and genres of one catalog load.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub records: Vec<SongRecord>,
    /// Distinct non-empty genres in first-seen order.
    pub genres: Vec<String>,
}

impl CatalogSnapshot {
    /// Build from a fetched range: header row first, data rows after.
    pub fn from_rows(range: &str, rows: &[Vec<String>]) -> Result<Self> {
        let Some((headers, data)) = rows.split_first() else {
            return Ok(Self::default());
        };
        let map = ColumnMap::resolve(&CATALOG_LAYOUT, range, headers)?;

        let records: Vec<SongRecord> = data
            .iter()
            .enumerate()
            .map(|(id, row)| SongRecord {
                id,
                title: map.declared(row, 0),
                artist: map.declared(row, 1),
                genre: map.declared(row, 2),
                year: map.declared(row, 3),
                extra: map.extra(row),
            })
            .collect();

        let mut seen = HashSet::new();
        let genres = records
            .iter()
            .filter(|r| !r.genre.is_empty())
            .filter(|r| seen.insert(r.genre.as_str()))
            .map(|r| r.genre.clone())
            .collect();

        Ok(Self { records, genres })
    }

    pub fn get(&self, id: usize) -> Option<&SongRecord> {
        self.records.get(id)
    }
}

/// The song catalog, loaded once from the catalog region.
pub struct CatalogIndex {
    source: Arc<dyn TabularSource>,
    range: String,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogIndex {
    pub fn new(source: Arc<dyn TabularSource>, range: impl Into<String>) -> Self {
        Self {
            source,
            range: range.into(),
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    /// Fetch the catalog region and swap in the new snapshot.
    /// On error the previous snapshot (empty before the first success) stays.
    #[instrument(level = "info", skip(self), fields(range = %self.range))]
    pub async fn load(&self) -> Result<()> {
        let rows = self.source.get(&self.range).await.map_err(|e| {
            warn!(error = %e, "catalog fetch failed");
            e
        })?;
        let snapshot = CatalogSnapshot::from_rows(&self.range, &rows).map_err(|e| {
            warn!(error = %e, "catalog rejected");
            e
        })?;

        info!(
            songs = snapshot.records.len(),
            genres = snapshot.genres.len(),
            "catalog loaded"
        );
        *self.current.write().unwrap() = Arc::new(snapshot);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read().unwrap())
    }
}
