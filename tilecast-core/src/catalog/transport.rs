//! Transport classification of stream links.

use std::fmt;

/// Streaming protocol family of a link, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportType {
    Hls,
    Dash,
    Progressive,
    #[default]
    Unknown,
}

/// Extension table in matching priority order.
const EXTENSIONS: &[(&str, TransportType)] = &[
    (".m3u8", TransportType::Hls),
    (".m3u", TransportType::Hls),
    (".mpd", TransportType::Dash),
    (".mp3", TransportType::Progressive),
];

impl TransportType {
    /// Classifies a link by the suffix of its path.
    ///
    /// Matching is case-insensitive and ignores any query string or fragment,
    /// so signed playlist URLs such as `live.m3u8?token=...` still classify.
    pub fn classify(link: &str) -> Self {
        let path = link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        EXTENSIONS
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, transport)| *transport)
            .unwrap_or(TransportType::Unknown)
    }

    /// Returns whether the player can handle this transport at all.
    pub fn is_playable(&self) -> bool {
        !matches!(self, TransportType::Unknown)
    }

    /// Short lowercase tag used in status lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Hls => "hls",
            TransportType::Dash => "dash",
            TransportType::Progressive => "progressive",
            TransportType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(
            TransportType::classify("http://a.example/live.m3u8"),
            TransportType::Hls
        );
        assert_eq!(
            TransportType::classify("http://a.example/list.M3U"),
            TransportType::Hls
        );
        assert_eq!(
            TransportType::classify("https://a.example/manifest.mpd"),
            TransportType::Dash
        );
        assert_eq!(
            TransportType::classify("http://radio.example/stream.mp3"),
            TransportType::Progressive
        );
    }

    #[test]
    fn test_classify_ignores_query_and_fragment() {
        assert_eq!(
            TransportType::classify("http://a.example/live.m3u8?token=abc.mp4"),
            TransportType::Hls
        );
        assert_eq!(
            TransportType::classify("http://a.example/manifest.mpd#t=10"),
            TransportType::Dash
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(TransportType::classify("x.mp4"), TransportType::Unknown);
        assert_eq!(TransportType::classify(""), TransportType::Unknown);
        assert!(!TransportType::Unknown.is_playable());
    }

    proptest! {
        #[test]
        fn classify_is_case_insensitive(stem in "[a-zA-Z0-9/_-]{1,24}") {
            for ext in [".m3u8", ".mpd", ".mp3", ".mp4"] {
                let lower = TransportType::classify(&format!("{stem}{ext}"));
                let upper = TransportType::classify(&format!("{stem}{}", ext.to_uppercase()));
                prop_assert_eq!(lower, upper);
            }
        }
    }
}
