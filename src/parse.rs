//! JSON decoding for the two bank formats.
//!
//! Both banks are JSON arrays of tuple-shaped rows. Rows are validated for
//! field count once here, at decode time; short rows are skipped and
//! counted rather than failing the batch. Invalid JSON at the file level is
//! a fatal error.

use crate::error::Result;
use crate::models::{TagRecord, TermRecord};
use log::{debug, warn};
use serde_json::Value;

/// Decoded rows of one bank file plus the count of rows rejected for being
/// below the minimum field count.
#[derive(Debug, Clone)]
pub struct ParsedBank<T> {
    pub records: Vec<T>,
    pub skipped_short: usize,
}

/// Parses a tag bank file's content into typed records.
pub fn parse_tag_bank(json: &str) -> Result<ParsedBank<TagRecord>> {
    debug!("Parsing tag bank JSON...");
    let rows: Vec<Value> = serde_json::from_str(json)?;
    Ok(decode_rows(rows, TagRecord::from_row, "tag"))
}

/// Parses a term bank file's content into typed records.
pub fn parse_term_bank(json: &str) -> Result<ParsedBank<TermRecord>> {
    debug!("Parsing term bank JSON...");
    let rows: Vec<Value> = serde_json::from_str(json)?;
    Ok(decode_rows(rows, TermRecord::from_row, "term"))
}

fn decode_rows<T>(
    rows: Vec<Value>,
    from_row: impl Fn(&Value) -> Option<T>,
    kind: &str,
) -> ParsedBank<T> {
    let total = rows.len();
    let records: Vec<T> = rows.iter().filter_map(&from_row).collect();
    let skipped_short = total - records.len();
    if skipped_short > 0 {
        warn!(
            "Skipped {} malformed {} record(s) below the minimum field count.",
            skipped_short, kind
        );
    }
    debug!("Decoded {} {} record(s).", records.len(), kind);
    ParsedBank {
        records,
        skipped_short,
    }
}
