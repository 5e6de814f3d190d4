//! Structural acceptance test for fetched payloads
//!
//! A payload is accepted when it parses as a JSON object exposing at least
//! one plausible TVBox shape:
//! - `sites`: an array with at least one object carrying `api` or `url`
//! - `lives`: an array with at least one object carrying `channels`
//! - `spider`: a non-blank string
//!
//! Nothing past these signals is interpreted.

use serde_json::{Map, Value};

/// Which shape made a payload acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigShape {
    Sites,
    Lives,
    Spider,
}

/// Returns true if the payload looks like a TVBox configuration
///
/// Malformed input never errors; it is simply rejected.
pub fn validate(body: &[u8]) -> bool {
    detect_shape(body).is_some()
}

/// Returns the first shape found in the payload, checking sites, lives, then spider
pub fn detect_shape(body: &[u8]) -> Option<ConfigShape> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let doc = value.as_object()?;

    if has_entry_with(doc, "sites", &["api", "url"]) {
        Some(ConfigShape::Sites)
    } else if has_entry_with(doc, "lives", &["channels"]) {
        Some(ConfigShape::Lives)
    } else if has_spider(doc) {
        Some(ConfigShape::Spider)
    } else {
        None
    }
}

fn has_entry_with(doc: &Map<String, Value>, key: &str, fields: &[&str]) -> bool {
    doc.get(key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries.iter().any(|entry| {
                entry
                    .as_object()
                    .map(|obj| fields.iter().any(|f| obj.contains_key(*f)))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

fn has_spider(doc: &Map<String, Value>) -> bool {
    doc.get("spider")
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sites_without_api_rejected() {
        assert!(!validate(br#"{"sites": [{"key":"k"}]}"#));
    }

    #[test]
    fn test_sites_with_api_accepted() {
        assert!(validate(br#"{"sites": [{"key":"k","api":"http://x"}]}"#));
        assert_eq!(
            detect_shape(br#"{"sites": [{"key":"k","api":"http://x"}]}"#),
            Some(ConfigShape::Sites)
        );
    }

    #[test]
    fn test_sites_with_url_accepted() {
        assert!(validate(br#"{"sites": ["junk", {"url":"http://x"}]}"#));
    }

    #[test]
    fn test_lives_need_channels() {
        assert!(!validate(br#"{"lives": [{"name":"x"}]}"#));
        assert!(validate(br#"{"lives": [{"group":"g","channels":[]}]}"#));
    }

    #[test]
    fn test_spider_must_be_non_blank_string() {
        assert!(validate(br#"{"spider": "./jar/spider.jar"}"#));
        assert!(!validate(br#"{"spider": "   "}"#));
        assert!(!validate(br#"{"spider": 42}"#));
    }

    #[test]
    fn test_weak_sites_fall_through_to_spider() {
        assert_eq!(
            detect_shape(br#"{"sites": [{"key":"k"}], "spider": "s.jar"}"#),
            Some(ConfigShape::Spider)
        );
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(!validate(b""));
        assert!(!validate(b"{not json"));
        assert!(!validate(b"[1, 2, 3]"));
        assert!(!validate(b"\"sites\""));
        assert!(!validate(&[0xff, 0xfe, 0x00]));
        assert!(!validate(br#"{"sites": "oops", "lives": {}}"#));
    }
}
