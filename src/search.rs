// src/search.rs

use crate::catalog::SongRecord;

/// Catalog records whose title or artist contains `query` (case-insensitive),
/// restricted to `genre` when it is non-empty (exact, case-sensitive).
/// Keeps catalog order.
pub fn search<'a>(records: &'a [SongRecord], query: &str, genre: &str) -> Vec<&'a SongRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|song| {
            song.title.to_lowercase().contains(&needle)
                || song.artist.to_lowercase().contains(&needle)
        })
        .filter(|song| genre.is_empty() || song.genre == genre)
        .collect()
}
