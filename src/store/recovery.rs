//! Stale temp file discovery
//!
//! A crash between the temp write and the rename leaves a
//! `{record}{ext}.tmp` file behind. The record itself still holds its
//! previous complete value, so leftovers are never replayed; they are
//! only reported or removed.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

use super::paths::TMP_SUFFIX;

/// List every leftover temp file for records with `extension`, sorted
///
/// Fails on the first entry the walk cannot read.
pub(crate) fn find_stale_tmp(base_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut stale = Vec::new();
    for entry in WalkDir::new(base_dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        push_if_stale(&mut stale, entry, extension);
    }

    stale.sort();
    Ok(stale)
}

/// Like [`find_stale_tmp`], but unreadable entries are logged and skipped
///
/// Used where the scan is purely diagnostic and must not fail the caller.
pub(crate) fn find_stale_tmp_lenient(base_dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut stale = Vec::new();
    for entry in WalkDir::new(base_dir).follow_links(false) {
        match entry {
            Ok(entry) => push_if_stale(&mut stale, entry, extension),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable entry in temp file scan"),
        }
    }

    stale.sort();
    stale
}

fn push_if_stale(stale: &mut Vec<PathBuf>, entry: walkdir::DirEntry, extension: &str) {
    if !entry.file_type().is_file() {
        return;
    }
    let suffix = format!("{}{}", extension, TMP_SUFFIX);
    if entry.file_name().to_string_lossy().ends_with(&suffix) {
        stale.push(entry.into_path());
    }
}
