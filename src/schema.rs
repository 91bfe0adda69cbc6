// src/schema.rs
//! Header rows to named fields.
//!
//! Each region declares the logical columns it needs. A fetched header row is
//! normalized and resolved against that declaration once per load; rows are
//! then read by position. A declared column absent from the header row fails
//! the load instead of quietly producing empty fields.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// How header text turns into a field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Lower-cased verbatim: "Song Title" -> "song title".
    Lower,
    /// Lower-cased, whitespace runs become `_`: "Song Title" -> "song_title".
    Snake,
}

impl HeaderStyle {
    pub fn normalize(self, header: &str) -> String {
        let lower = header.to_lowercase();
        match self {
            HeaderStyle::Lower => lower,
            HeaderStyle::Snake => WHITESPACE_RUN.replace_all(&lower, "_").into_owned(),
        }
    }
}

/// A column a region must carry, with the normalized header names accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

impl Column {
    fn accepts(&self, key: &str) -> bool {
        self.field == key || self.aliases.contains(&key)
    }
}

/// Declared layout of one region.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub style: HeaderStyle,
    pub columns: &'static [Column],
}

pub const CATALOG_LAYOUT: Layout = Layout {
    style: HeaderStyle::Lower,
    columns: &[
        Column {
            field: "title",
            aliases: &["song"],
        },
        Column {
            field: "artist",
            aliases: &[],
        },
        Column {
            field: "genre",
            aliases: &[],
        },
        Column {
            field: "year",
            aliases: &[],
        },
    ],
};

pub const REQUESTS_LAYOUT: Layout = Layout {
    style: HeaderStyle::Snake,
    columns: &[
        Column {
            field: "timestamp",
            aliases: &[],
        },
        Column {
            field: "song_title",
            aliases: &[],
        },
        Column {
            field: "requested_by",
            aliases: &[],
        },
        Column {
            field: "status",
            aliases: &[],
        },
    ],
};

/// A header row resolved against a [`Layout`].
#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// Position of each declared column, in declaration order.
    declared: Vec<usize>,
    /// Headers not claimed by a declared column: (key, position).
    extra: Vec<(String, usize)>,
}

impl ColumnMap {
    pub fn resolve(layout: &Layout, range: &str, headers: &[String]) -> Result<Self> {
        let keys: Vec<String> = headers.iter().map(|h| layout.style.normalize(h)).collect();

        let mut declared = Vec::with_capacity(layout.columns.len());
        for col in layout.columns {
            let pos = keys
                .iter()
                .position(|k| col.accepts(k))
                .ok_or_else(|| Error::MissingColumn {
                    range: range.to_string(),
                    column: col.field,
                })?;
            declared.push(pos);
        }

        let extra = keys
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !declared.contains(i))
            .map(|(i, k)| (k, i))
            .collect();

        Ok(Self { declared, extra })
    }

    /// Cell of the `n`th declared column; missing trailing cells read as "".
    pub fn declared(&self, row: &[String], n: usize) -> String {
        cell(row, self.declared[n])
    }

    /// Every undeclared header with its cell.
    pub fn extra(&self, row: &[String]) -> BTreeMap<String, String> {
        self.extra
            .iter()
            .map(|(k, i)| (k.clone(), cell(row, *i)))
            .collect()
    }
}

fn cell(row: &[String], i: usize) -> String {
    row.get(i).cloned().unwrap_or_default()
}
