//! JSONL persistence for the price cache

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::entry::{CacheEntry, FreshnessPolicy};
use super::store::PriceCache;

/// Load the cache from a JSONL file. A missing file yields an empty cache;
/// unreadable lines are skipped with a warning.
pub fn load_cache(
    path: &Path,
    freshness: FreshnessPolicy,
    similarity_threshold: f64,
) -> Result<PriceCache> {
    let cache = PriceCache::new(freshness, similarity_threshold);
    if !path.exists() {
        tracing::info!("No cache file at {:?}, starting empty", path);
        return Ok(cache);
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open cache file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut skipped = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read cache file: {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CacheEntry>(&line) {
            Ok(entry) => {
                let key = entry.normalized_key.clone();
                cache.upsert(&key, entry);
            }
            Err(e) => {
                tracing::warn!("Skipping cache line {} in {:?}: {}", lineno + 1, path, e);
                skipped += 1;
            }
        }
    }

    tracing::info!("Loaded {} cache entries from {:?} ({} skipped)", cache.len(), path, skipped);
    Ok(cache)
}

/// Write a full snapshot of the cache, replacing the file atomically.
pub fn save_cache(cache: &PriceCache, path: &Path) -> Result<usize> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
    }

    let entries = cache.entries();
    let temp_path = path.with_extension("jsonl.tmp");
    {
        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create {:?}", temp_path))?;
        for entry in &entries {
            let json = serde_json::to_string(entry)?;
            writeln!(file, "{}", json)?;
        }
        file.flush()?;
    }

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    tracing::info!("Wrote {} cache entries to {:?}", entries.len(), path);
    Ok(entries.len())
}
