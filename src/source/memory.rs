// src/source/memory.rs

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use super::TabularSource;
use crate::error::{Error, Result};

/// One call seen by a [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOp {
    Get { range: String },
    Append { range: String, row: Vec<String> },
}

/// In-memory [`TabularSource`] that records every call.
///
/// Appends land at the end of the named range, so a later `get` sees them.
/// Failures can be injected per range to exercise the error paths.
#[derive(Debug, Default)]
pub struct MemorySource {
    ranges: Mutex<HashMap<String, Vec<Vec<String>>>>,
    failing: Mutex<HashSet<String>>,
    operations: Mutex<Vec<SourceOp>>,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the content of `range`.
    pub fn set_rows<R, C>(&self, range: &str, rows: R)
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        self.ranges.lock().unwrap().insert(range.to_string(), rows);
    }

    pub fn rows(&self, range: &str) -> Vec<Vec<String>> {
        self.ranges
            .lock()
            .unwrap()
            .get(range)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every call against `range` fail until [`MemorySource::heal`].
    pub fn fail(&self, range: &str) {
        self.failing.lock().unwrap().insert(range.to_string());
    }

    pub fn heal(&self, range: &str) {
        self.failing.lock().unwrap().remove(range);
    }

    pub fn operations(&self) -> Vec<SourceOp> {
        self.operations.lock().unwrap().clone()
    }

    pub fn get_count(&self, range: &str) -> usize {
        self.operations
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, SourceOp::Get { range: r } if r == range))
            .count()
    }

    pub fn appended(&self, range: &str) -> Vec<Vec<String>> {
        self.operations
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                SourceOp::Append { range: r, row } if r == range => Some(row.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: SourceOp) {
        self.operations.lock().unwrap().push(op);
    }

    fn check_failure(&self, range: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(range) {
            return Err(Error::fetch(range, "injected failure"));
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl TabularSource for MemorySource {
    async fn get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.record(SourceOp::Get {
            range: range.to_string(),
        });
        self.maybe_delay().await;
        self.check_failure(range)?;
        Ok(self.rows(range))
    }

    async fn append(&self, range: &str, row: Vec<String>) -> Result<()> {
        self.record(SourceOp::Append {
            range: range.to_string(),
            row: row.clone(),
        });
        self.maybe_delay().await;
        self.check_failure(range)?;
        self.ranges
            .lock()
            .unwrap()
            .entry(range.to_string())
            .or_default()
            .push(row);
        Ok(())
    }
}
