//! Normalization of raw feed records into [`MediaSource`] values.
//!
//! Partial feed corruption must not abort the whole catalog: malformed
//! entries and variants are skipped, only a non-array top level is an error.

use serde_json::{Map, Value};
use url::Url;

use super::{CatalogError, MediaSource, StreamVariant};

/// Normalizes a raw feed document, keeping links exactly as given.
///
/// # Errors
///
/// - `CatalogError::Validation` - The top-level value is not an array
pub fn normalize(raw: &Value) -> Result<Vec<MediaSource>, CatalogError> {
    normalize_with_base(raw, None)
}

/// Normalizes a raw feed document, resolving relative links against `base`.
///
/// # Errors
///
/// - `CatalogError::Validation` - The top-level value is not an array
pub fn normalize_with_base(
    raw: &Value,
    base: Option<&Url>,
) -> Result<Vec<MediaSource>, CatalogError> {
    let entries = raw.as_array().ok_or_else(|| CatalogError::Validation {
        reason: format!("expected a JSON array, found {}", value_kind(raw)),
    })?;

    let sources: Vec<MediaSource> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, base))
        .collect();

    tracing::debug!(
        "Normalized {} of {} catalog entries",
        sources.len(),
        entries.len()
    );

    Ok(sources)
}

fn normalize_entry(entry: &Value, base: Option<&Url>) -> Option<MediaSource> {
    let object = entry.as_object()?;
    let raw_streams = object.get("streams")?.as_array()?;

    let streams: Vec<StreamVariant> = raw_streams
        .iter()
        .filter_map(|stream| normalize_stream(stream, base))
        .filter(|variant| variant.transport.is_playable())
        .collect();

    if streams.is_empty() {
        return None;
    }

    let logo = string_field(object, "logo");
    Some(MediaSource {
        name: string_field(object, "name"),
        group: string_field(object, "group"),
        logo_url: (!logo.is_empty()).then_some(logo),
        streams,
    })
}

fn normalize_stream(stream: &Value, base: Option<&Url>) -> Option<StreamVariant> {
    let object = stream.as_object()?;
    let link = object.get("link")?.as_str()?.trim();
    if link.is_empty() {
        return None;
    }

    let link = match base {
        Some(base) if Url::parse(link).is_err() => base.join(link).ok()?.to_string(),
        _ => link.to_string(),
    };

    let available = object.get("available").is_some_and(is_truthy);
    Some(StreamVariant::new(string_field(object, "id"), link, available))
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::catalog::TransportType;

    #[test]
    fn test_drops_unknown_transport_sources() {
        let raw = json!([
            {"name": "A", "streams": [{"link": "x.mp4"}]},
            {"name": "B", "streams": [{"link": "b.m3u8"}]}
        ]);

        let sources = normalize(&raw).unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "B");
        assert_eq!(sources[0].streams[0].transport, TransportType::Hls);
        assert_eq!(sources[0].streams[0].link, "b.m3u8");
    }

    #[test]
    fn test_rejects_non_array_top_level() {
        let result = normalize(&json!({"streams": []}));
        assert!(matches!(result, Err(CatalogError::Validation { .. })));
    }

    #[test]
    fn test_skips_entries_without_usable_streams() {
        let raw = json!([
            {"name": "no streams"},
            {"name": "streams not array", "streams": "http://a/b.m3u8"},
            {"name": "empty link", "streams": [{"link": ""}, {"id": "x"}]},
            "not an object",
            {"name": "ok", "group": "News", "logo": "http://a/logo.png",
             "streams": [{"id": "s1", "link": "http://a/live.m3u8", "available": true}]}
        ]);

        let sources = normalize(&raw).unwrap();

        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.group, "News");
        assert_eq!(source.logo_url.as_deref(), Some("http://a/logo.png"));
        assert_eq!(source.streams[0].id, "s1");
        assert!(source.streams[0].available);
    }

    #[test]
    fn test_mixed_variants_keep_only_playable() {
        let raw = json!([{
            "name": "Mixed",
            "streams": [
                {"id": "a", "link": "http://a/video.mp4", "available": true},
                {"id": "b", "link": "http://a/manifest.mpd"},
                {"id": "c", "link": "http://a/radio.mp3", "available": 1}
            ]
        }]);

        let sources = normalize(&raw).unwrap();
        let ids: Vec<&str> = sources[0].streams.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["b", "c"]);
        assert!(!sources[0].streams[0].available);
        assert!(sources[0].streams[1].available);
        assert!(sources[0].logo_url.is_none());
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        let base = Url::parse("http://tv.local:8080/api/streams").unwrap();
        let raw = json!([{"name": "Local", "streams": [{"link": "/streams/local.m3u8"}]}]);

        let sources = normalize_with_base(&raw, Some(&base)).unwrap();

        assert_eq!(sources[0].streams[0].link, "http://tv.local:8080/streams/local.m3u8");
    }

    proptest! {
        #[test]
        fn normalized_sources_are_never_empty_or_unknown(
            links in proptest::collection::vec(
                prop_oneof![
                    Just(String::new()),
                    "[a-z]{1,8}\\.(m3u8|mpd|mp3|mp4|ts)",
                ],
                0..6,
            )
        ) {
            let streams: Vec<Value> = links.iter().map(|l| json!({"link": l})).collect();
            let raw = json!([{"name": "P", "streams": streams}]);

            let sources = normalize(&raw).unwrap();

            for source in &sources {
                prop_assert!(!source.streams.is_empty());
                for stream in &source.streams {
                    prop_assert!(!stream.link.is_empty());
                    prop_assert_ne!(stream.transport, TransportType::Unknown);
                }
            }
        }
    }
}
