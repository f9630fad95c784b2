//! Structured-content tree walker.
//!
//! Term-bank entries carry a nested, heterogeneously-typed content tree:
//! strings, arrays, and tagged element objects mixed at arbitrary depth.
//! This module converts that tree into a typed node structure and extracts
//! the two sequences the loader persists: glossary definitions and
//! source/target example-sentence pairs. The walk is a pure function of the
//! tree and never fails; malformed substructures are skipped.

use serde_json::Value;

/// Language tag that marks the target half of an example pair.
const TARGET_LANG: &str = "en";

/// List-item tag for glossary and example children.
const LIST_ITEM_TAG: &str = "li";

/// A node of the structured-content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    /// A plain text leaf.
    Text(String),
    /// An ordered sequence of sibling nodes.
    Sequence(Vec<ContentNode>),
    /// A tagged element object.
    Element(Box<Element>),
    /// Anything else (numbers, booleans, null); never traversed.
    Ignored,
}

/// A composite element node.
///
/// Only the fields the walker cares about are lifted out; every other
/// object- or array-valued field of the source object lands in `extra` so
/// the walk still reaches glossary/examples nodes buried inside wrapper
/// structures of unknown shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Option<String>,
    pub lang: Option<String>,
    /// Role marker from the element's `data.content` field
    /// (e.g. "glossary", "examples").
    pub role: Option<String>,
    /// The element's `content` field.
    pub content: ContentNode,
    /// Remaining object/array-valued fields, traversed after `content`.
    pub extra: Vec<ContentNode>,
}

impl ContentNode {
    /// Builds a node from raw JSON. Total: unrecognized shapes become
    /// `Ignored` rather than errors.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => ContentNode::Text(text.clone()),
            Value::Array(items) => {
                ContentNode::Sequence(items.iter().map(ContentNode::from_value).collect())
            }
            Value::Object(fields) => {
                let role = fields
                    .get("data")
                    .and_then(|data| data.get("content"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let content = fields
                    .get("content")
                    .map(ContentNode::from_value)
                    .unwrap_or(ContentNode::Ignored);
                let extra = fields
                    .iter()
                    .filter(|(key, _)| *key != "content")
                    .filter(|(_, v)| v.is_object() || v.is_array())
                    .map(|(_, v)| ContentNode::from_value(v))
                    .collect();
                ContentNode::Element(Box::new(Element {
                    tag: fields.get("tag").and_then(Value::as_str).map(str::to_string),
                    lang: fields
                        .get("lang")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    role,
                    content,
                    extra,
                }))
            }
            _ => ContentNode::Ignored,
        }
    }
}

impl Element {
    fn is_list_item(&self) -> bool {
        self.tag.as_deref() == Some(LIST_ITEM_TAG)
    }

    /// The element's content when it is a plain text leaf.
    fn text(&self) -> Option<&str> {
        match &self.content {
            ContentNode::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Definitions and example pairs extracted from one entry's content tree,
/// in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub definitions: Vec<String>,
    pub examples: Vec<(String, String)>,
}

/// Walks a content tree and extracts definitions and example pairs.
pub fn extract_content(value: &Value) -> ExtractedContent {
    let root = ContentNode::from_value(value);
    let mut out = ExtractedContent::default();
    walk(&root, &mut out);
    out
}

/// Pre-order depth-first walk. Extraction happens when a glossary or
/// examples element is visited, before descending into it, so nested
/// occurrences are still found and document order is preserved.
fn walk(node: &ContentNode, out: &mut ExtractedContent) {
    match node {
        ContentNode::Element(element) => {
            match element.role.as_deref() {
                Some("glossary") => collect_definitions(element, out),
                Some("examples") => collect_examples(element, out),
                _ => {}
            }
            walk(&element.content, out);
            for child in &element.extra {
                walk(child, out);
            }
        }
        ContentNode::Sequence(items) => {
            for item in items {
                walk(item, out);
            }
        }
        ContentNode::Text(_) | ContentNode::Ignored => {}
    }
}

/// Each list-item child of a glossary element with plain-text content
/// contributes one definition.
fn collect_definitions(element: &Element, out: &mut ExtractedContent) {
    let ContentNode::Sequence(children) = &element.content else {
        return;
    };
    for child in children {
        if let ContentNode::Element(item) = child {
            if item.is_list_item() {
                if let Some(text) = item.text() {
                    out.definitions.push(text.to_string());
                }
            }
        }
    }
}

/// Children of an examples element are consumed two-at-a-time by raw index:
/// source sentence first, target translation second. A pair is kept only
/// when both halves are non-empty list items and the second carries the
/// target language tag; a trailing unmatched child is dropped.
fn collect_examples(element: &Element, out: &mut ExtractedContent) {
    let ContentNode::Sequence(children) = &element.content else {
        return;
    };
    for pair in children.chunks_exact(2) {
        let (ContentNode::Element(source), ContentNode::Element(target)) = (&pair[0], &pair[1])
        else {
            continue;
        };
        if !source.is_list_item()
            || !target.is_list_item()
            || target.lang.as_deref() != Some(TARGET_LANG)
        {
            continue;
        }
        match (source.text(), target.text()) {
            (Some(source_text), Some(target_text))
                if !source_text.is_empty() && !target_text.is_empty() =>
            {
                out.examples
                    .push((source_text.to_string(), target_text.to_string()));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn glossary(items: Value) -> Value {
        json!({
            "tag": "div",
            "data": { "content": "glossary" },
            "content": items,
        })
    }

    fn examples(items: Value) -> Value {
        json!({
            "tag": "div",
            "data": { "content": "examples" },
            "content": items,
        })
    }

    fn li(text: &str) -> Value {
        json!({ "tag": "li", "content": text })
    }

    fn li_en(text: &str) -> Value {
        json!({ "tag": "li", "lang": "en", "content": text })
    }

    #[test]
    fn test_definitions_in_document_order() {
        let tree = glossary(json!([li("first"), li("second"), li("third")]));
        let extracted = extract_content(&tree);
        assert_eq!(extracted.definitions, vec!["first", "second", "third"]);
        assert!(extracted.examples.is_empty());
    }

    #[test]
    fn test_non_list_item_children_skipped() {
        let tree = glossary(json!([
            li("kept"),
            { "tag": "span", "content": "not a list item" },
            "bare string",
            li("also kept"),
        ]));
        let extracted = extract_content(&tree);
        assert_eq!(extracted.definitions, vec!["kept", "also kept"]);
    }

    #[test]
    fn test_example_pairs() {
        let tree = examples(json!([
            li("猫が好きです。"),
            li_en("I like cats."),
            li("犬も好きです。"),
            li_en("I like dogs too."),
        ]));
        let extracted = extract_content(&tree);
        assert_eq!(
            extracted.examples,
            vec![
                ("猫が好きです。".to_string(), "I like cats.".to_string()),
                ("犬も好きです。".to_string(), "I like dogs too.".to_string()),
            ]
        );
    }

    #[test]
    fn test_odd_trailing_example_dropped() {
        let tree = examples(json!([
            li("猫が好きです。"),
            li_en("I like cats."),
            li("unmatched"),
        ]));
        let extracted = extract_content(&tree);
        assert_eq!(extracted.examples.len(), 1);
    }

    #[test]
    fn test_example_without_target_lang_rejected() {
        let tree = examples(json!([li("猫が好きです。"), li("I like cats.")]));
        let extracted = extract_content(&tree);
        assert!(extracted.examples.is_empty());
    }

    #[test]
    fn test_example_with_empty_half_rejected() {
        let tree = examples(json!([li(""), li_en("I like cats.")]));
        let extracted = extract_content(&tree);
        assert!(extracted.examples.is_empty());

        let tree = examples(json!([li("猫"), li_en("")]));
        let extracted = extract_content(&tree);
        assert!(extracted.examples.is_empty());
    }

    #[test]
    fn test_bad_pair_does_not_shift_later_pairs() {
        // Pairing is positional: an invalid pair is dropped without
        // re-aligning the remaining children.
        let tree = examples(json!([
            li("no translation follows"),
            li("missing lang"),
            li("後の文。"),
            li_en("A later sentence."),
        ]));
        let extracted = extract_content(&tree);
        assert_eq!(
            extracted.examples,
            vec![("後の文。".to_string(), "A later sentence.".to_string())]
        );
    }

    #[test]
    fn test_nested_inside_wrapper_structures() {
        let tree = json!({
            "tag": "div",
            "content": [
                { "tag": "div", "decorations": [ glossary(json!([li("nested def")])) ] },
            ],
            "sidebar": { "inner": examples(json!([li("例文。"), li_en("An example.")])) },
        });
        let extracted = extract_content(&tree);
        assert_eq!(extracted.definitions, vec!["nested def"]);
        assert_eq!(
            extracted.examples,
            vec![("例文。".to_string(), "An example.".to_string())]
        );
    }

    #[test]
    fn test_malformed_shapes_are_not_fatal() {
        for tree in [
            json!(null),
            json!(42),
            json!("just text"),
            json!({ "data": 17, "content": { "content": { "content": [] } } }),
            json!([[[["deep"]]], { "tag": null }]),
        ] {
            let extracted = extract_content(&tree);
            assert!(extracted.definitions.is_empty());
            assert!(extracted.examples.is_empty());
        }
    }

    #[test]
    fn test_glossary_with_non_string_content_skipped() {
        let tree = glossary(json!([
            { "tag": "li", "content": ["structured", "content"] },
            li("plain"),
        ]));
        let extracted = extract_content(&tree);
        assert_eq!(extracted.definitions, vec!["plain"]);
    }

    #[test]
    fn test_glossary_without_list_content_yields_nothing() {
        let tree = json!({
            "tag": "div",
            "data": { "content": "glossary" },
            "content": "not a list",
        });
        let extracted = extract_content(&tree);
        assert!(extracted.definitions.is_empty());
    }
}
