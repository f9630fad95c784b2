//! Input file discovery for dictionary banks.
//!
//! A term bank may be supplied as a single JSON file or as a directory
//! containing multiple `term_bank_*.json` files. Directory contents are
//! processed in sorted name order so that multi-file loads are
//! deterministic across runs.

use crate::error::{DictError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Filename prefix of term bank files inside a dictionary directory.
const TERM_BANK_PREFIX: &str = "term_bank_";
const TERM_BANK_SUFFIX: &str = ".json";

/// Resolves a term-bank path into the ordered list of files to load.
///
/// A file path yields itself; a directory yields its `term_bank_*.json`
/// members sorted by name. A missing path is a fatal input error.
pub fn discover_term_banks(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        debug!("Term bank path is a single file: {:?}", path);
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(DictError::DataFileNotFound(path.display().to_string()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_term_bank_name(p))
        .collect();
    files.sort();

    info!(
        "Discovered {} term bank file(s) in {:?}.",
        files.len(),
        path
    );
    Ok(files)
}

fn is_term_bank_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TERM_BANK_PREFIX) && name.ends_with(TERM_BANK_SUFFIX))
}

/// Reads one input file fully into memory. Banks are JSON arrays, so
/// streaming decode buys nothing here.
pub fn read_bank_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DictError::DataFileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}
