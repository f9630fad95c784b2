use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

// --- Raw bank records ---

/// One row of a tag bank file: `[name, category, priority, description, ...]`.
///
/// Extra trailing elements are tolerated; rows with fewer than four elements
/// are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    /// Empty string when the tag bank leaves the category blank.
    pub category: String,
    pub priority_score: f64,
    pub description: String,
}

impl TagRecord {
    /// Minimum element count for a usable tag-bank row.
    pub const MIN_FIELDS: usize = 4;

    /// Converts one raw JSON array row into a typed record.
    /// Returns `None` for rows below the minimum field count.
    pub fn from_row(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Some(TagRecord {
            name: fields[0].as_str().unwrap_or_default().to_string(),
            category: fields[1].as_str().unwrap_or_default().to_string(),
            priority_score: fields[2].as_f64().unwrap_or(0.0),
            description: fields[3].as_str().unwrap_or_default().to_string(),
        })
    }
}

/// One row of a term bank file:
/// `[term, reading, posTags, otherTags, priority, content, signedId, metadata?]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    pub reading: String,
    /// Comma-separated part-of-speech tokens. Empty when the source field
    /// was missing or not a string.
    pub pos_tags: String,
    /// Comma-separated domain/dialect/usage/name tokens.
    pub other_tags: String,
    pub priority_score: i64,
    /// The raw structured-content tree; shape is unspecified and walked
    /// defensively by the content module.
    pub content: Value,
    /// Signed entry ID; negative means the entry is a redirect.
    pub entry_id: i64,
    /// Trailing metadata string carrying markers and frequency annotations.
    pub metadata: Option<String>,
}

impl TermRecord {
    /// Minimum element count for a usable term-bank row.
    pub const MIN_FIELDS: usize = 7;

    /// Converts one raw JSON array row into a typed record.
    /// Returns `None` for rows below the minimum field count.
    pub fn from_row(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Some(TermRecord {
            term: fields[0].as_str().unwrap_or_default().to_string(),
            reading: fields[1].as_str().unwrap_or_default().to_string(),
            pos_tags: fields[2].as_str().unwrap_or_default().to_string(),
            other_tags: fields[3].as_str().unwrap_or_default().to_string(),
            priority_score: fields[4].as_i64().unwrap_or(0),
            content: fields[5].clone(),
            entry_id: fields[6].as_i64()?,
            metadata: fields.get(7).and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Canonical entry ID: magnitude of the signed ID.
    pub fn abs_id(&self) -> i64 {
        self.entry_id.unsigned_abs() as i64
    }

    /// A negative signed ID marks a cross-reference redirect.
    pub fn is_redirect(&self) -> bool {
        self.entry_id < 0
    }

    /// True iff the metadata string carries the news-frequency star marker.
    pub fn news_freq(&self) -> bool {
        self.metadata
            .as_deref()
            .is_some_and(|m| m.contains(NEWS_FREQ_MARKER))
    }

    /// Special annotation markers present in the metadata string, in the
    /// fixed marker-set order.
    pub fn special_markers(&self) -> Vec<&'static str> {
        match self.metadata.as_deref() {
            Some(meta) => SPECIAL_MARKERS
                .iter()
                .copied()
                .filter(|marker| meta.contains(marker))
                .collect(),
            None => Vec::new(),
        }
    }

    /// News-frequency rank bucket derived from a `news<N>k` annotation.
    pub fn news_rank(&self) -> Option<NewsRank> {
        self.metadata.as_deref().and_then(NewsRank::from_metadata)
    }
}

/// Splits a comma-separated tag string into trimmed, non-empty tokens.
pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(',').map(str::trim).filter(|t| !t.is_empty())
}

// --- Annotation constants ---

/// Marker glyph that doubles as the news-frequency flag.
pub const NEWS_FREQ_MARKER: &str = "⭐";

/// Fixed set of annotation glyphs recorded as special markers.
pub const SPECIAL_MARKERS: [&str; 4] = ["⭐", "⚠️", "⛬", "🅁"];

/// Domain codes that classify a category-less tag-bank row as a field.
pub const FIELD_NAMES: [&str; 6] = ["math", "med", "comp", "physics", "chem", "biol"];

/// Dialect codes; membership alone classifies a row as a dialect.
pub const DIALECT_NAMES: [&str; 6] = ["ksb", "ktb", "kyb", "tsb", "thb", "hob"];

/// Usage codes; membership alone classifies a row as a usage type.
pub const USAGE_NAMES: [&str; 6] = ["col", "hon", "arch", "obs", "rare", "uk"];

/// Tag-bank category value that marks a part-of-speech row.
pub const POS_CATEGORY: &str = "partOfSpeech";

/// Tag-bank category value that marks a name-type row.
pub const NAME_CATEGORY: &str = "name";

static NEWS_RANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"news(\d+)k").expect("valid news rank pattern"));

/// A coarse corpus-frequency bucket derived from a `news<N>k` annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRank {
    pub rank_type: String,
    pub rank_start: i64,
    pub rank_end: i64,
}

impl NewsRank {
    /// Scans a metadata string for a `news<N>k` annotation and expands it
    /// into the rank positions it covers: (N-1)*1000+1 through N*1000.
    pub fn from_metadata(metadata: &str) -> Option<Self> {
        let captures = NEWS_RANK_RE.captures(metadata)?;
        let n: i64 = captures[1].parse().ok()?;
        Some(NewsRank {
            rank_type: format!("news{n}k"),
            rank_start: (n - 1) * 1000 + 1,
            rank_end: n * 1000,
        })
    }
}

// --- Persisted entity views ---

/// A dictionary entry row as stored in the `entries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub term: String,
    pub reading: String,
    pub priority_score: i64,
    pub news_freq: bool,
    pub is_redirect: bool,
    pub redirects_to: Option<i64>,
}

/// A definition row, ordered by `position` within its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub entry_id: i64,
    pub content: String,
    pub position: i64,
}

/// A source/target example-sentence pair, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub entry_id: i64,
    pub source_text: String,
    pub target_text: String,
    pub position: i64,
}

/// An alternate (term, reading) spelling of an entry's headword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeForm {
    pub entry_id: i64,
    pub term: String,
    pub reading: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_term_record_from_row() {
        let row = json!(["猫", "ねこ", "n", "uk", 100, [], 1234, "⭐ news1k"]);
        let record = TermRecord::from_row(&row).unwrap();
        assert_eq!(record.term, "猫");
        assert_eq!(record.reading, "ねこ");
        assert_eq!(record.abs_id(), 1234);
        assert!(!record.is_redirect());
        assert!(record.news_freq());
    }

    #[test]
    fn test_term_record_rejects_short_row() {
        let row = json!(["猫", "ねこ", "n", "", 100, []]);
        assert!(TermRecord::from_row(&row).is_none());
    }

    #[test]
    fn test_term_record_without_metadata() {
        let row = json!(["犬", "いぬ", "n", "", 50, [], 42]);
        let record = TermRecord::from_row(&row).unwrap();
        assert_eq!(record.metadata, None);
        assert!(!record.news_freq());
        assert!(record.special_markers().is_empty());
        assert!(record.news_rank().is_none());
    }

    #[test]
    fn test_redirect_identity() {
        let row = json!(["旧字", "きゅうじ", "", "", 0, [], -99]);
        let record = TermRecord::from_row(&row).unwrap();
        assert!(record.is_redirect());
        assert_eq!(record.abs_id(), 99);
    }

    #[test]
    fn test_non_string_pos_tags_tolerated() {
        let row = json!(["語", "ご", null, 7, 0, [], 5]);
        let record = TermRecord::from_row(&row).unwrap();
        assert_eq!(record.pos_tags, "");
        assert_eq!(record.other_tags, "");
    }

    #[test]
    fn test_special_markers_scan() {
        let row = json!(["語", "ご", "", "", 0, [], 5, "⚠️🅁"]);
        let record = TermRecord::from_row(&row).unwrap();
        assert_eq!(record.special_markers(), vec!["⚠️", "🅁"]);
    }

    #[test]
    fn test_news_rank_bucket() {
        let rank = NewsRank::from_metadata("news5k").unwrap();
        assert_eq!(rank.rank_type, "news5k");
        assert_eq!(rank.rank_start, 4001);
        assert_eq!(rank.rank_end, 5000);

        let first = NewsRank::from_metadata("⭐ news1k extra").unwrap();
        assert_eq!(first.rank_start, 1);
        assert_eq!(first.rank_end, 1000);

        assert!(NewsRank::from_metadata("newsk").is_none());
    }

    #[test]
    fn test_split_tags_whitespace() {
        let a: Vec<_> = split_tags("a, b ,c").collect();
        let b: Vec<_> = split_tags("a,b,c").collect();
        assert_eq!(a, b);
        assert_eq!(a, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tag_record_from_row() {
        let row = json!(["n", "partOfSpeech", -3, "noun (common)", 0]);
        let record = TagRecord::from_row(&row).unwrap();
        assert_eq!(record.name, "n");
        assert_eq!(record.category, "partOfSpeech");
        assert_eq!(record.priority_score, -3.0);
        assert_eq!(record.description, "noun (common)");

        assert!(TagRecord::from_row(&json!(["n", "partOfSpeech"])).is_none());
    }
}
