//! Drive object id extraction from the media fields of a content row.
//!
//! The fields hold whatever the user pasted: share links, `open?id=` links,
//! folder links, bare ids, or a JSON array of any of those.

use regex::Regex;
use std::sync::OnceLock;

/// Plausible length window for a drive object id.
const MIN_ID_LEN: usize = 25;
const MAX_ID_LEN: usize = 50;

struct Extractor {
    pattern: Regex,
    /// Capture group holding the id (0 for the whole match).
    group: usize,
}

fn extractors() -> &'static [Extractor] {
    static EXTRACTORS: OnceLock<Vec<Extractor>> = OnceLock::new();
    EXTRACTORS.get_or_init(|| {
        [
            (r"[-\w]{25,}", 0),
            (r"/d/([-\w]+)", 1),
            (r"id=([-\w]+)", 1),
            (r"folders/([-\w]+)", 1),
        ]
        .into_iter()
        .filter_map(|(pattern, group)| {
            Regex::new(pattern)
                .ok()
                .map(|pattern| Extractor { pattern, group })
        })
        .collect()
    })
}

/// Returns the first element when `raw` is a JSON array of strings.
pub fn first_of_json_list(raw: &str) -> Option<String> {
    json_list(raw).and_then(|items| items.into_iter().next())
}

/// Parses `raw` as a JSON array of strings. Non-string items are skipped.
pub fn json_list(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(trimmed).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

pub fn looks_like_json_list(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

/// Extracts a drive object id from a URL, a bare id or a JSON list of either.
///
/// Only the first element of a JSON list is considered. Returns `None` when
/// no extractor yields a token inside the id length window.
pub fn resolve_drive_id(raw: &str) -> Option<String> {
    let working = match first_of_json_list(raw) {
        Some(first) => first,
        None => raw.trim().to_string(),
    };
    if working.is_empty() {
        return None;
    }

    for extractor in extractors() {
        for captures in extractor.pattern.captures_iter(&working) {
            if let Some(token) = captures.get(extractor.group) {
                let len = token.as_str().len();
                if (MIN_ID_LEN..=MAX_ID_LEN).contains(&len) {
                    return Some(token.as_str().to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz_12345";

    #[test]
    fn test_share_link() {
        let url = format!("https://drive.google.com/file/d/{}/view?usp=sharing", ID);
        assert_eq!(resolve_drive_id(&url).as_deref(), Some(ID));
    }

    #[test]
    fn test_open_and_folder_links() {
        let open = format!("https://drive.google.com/open?id={}", ID);
        let folder = format!("https://drive.google.com/drive/folders/{}", ID);
        assert_eq!(resolve_drive_id(&open).as_deref(), Some(ID));
        assert_eq!(resolve_drive_id(&folder).as_deref(), Some(ID));
        assert_eq!(resolve_drive_id(ID).as_deref(), Some(ID));
    }

    #[test]
    fn test_json_list_uses_first_element_only() {
        let other = "9ZyXwVuTsRqPoNmLkJiHgFeDcBa_98765";
        let raw = format!(
            r#"["https://drive.google.com/file/d/{}/view", "https://drive.google.com/file/d/{}/view"]"#,
            ID, other
        );
        assert_eq!(resolve_drive_id(&raw).as_deref(), Some(ID));

        let raw = format!(r#"["https://example.com/a.png", "{}"]"#, other);
        assert_eq!(resolve_drive_id(&raw), None);
    }

    #[test]
    fn test_rejects_short_and_overlong_tokens() {
        assert_eq!(resolve_drive_id("https://drive.google.com/open?id=short"), None);
        let long = "x".repeat(60);
        assert_eq!(resolve_drive_id(&format!("https://cdn.example.com/?t={}", long)), None);
        assert_eq!(resolve_drive_id(""), None);
        assert_eq!(resolve_drive_id("https://example.com/photo.jpg"), None);
    }

    #[test]
    fn test_extracted_ids_stay_in_window() {
        for len in [25usize, 33, 44, 50] {
            let id = "a".repeat(len);
            let url = format!("https://drive.google.com/file/d/{}/view", id);
            let found = resolve_drive_id(&url).unwrap();
            assert!((MIN_ID_LEN..=MAX_ID_LEN).contains(&found.len()));
        }
    }

    #[test]
    fn test_json_list_helpers() {
        assert_eq!(
            json_list(r#"[" a ", 3, "", "b"]"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(json_list("not a list"), None);
        assert!(looks_like_json_list(" [1] "));
    }
}
