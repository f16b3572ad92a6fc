//! Source URL classification and output format validation
//!
//! Both checks are pure and total: they never fail, they only answer.
//! [`SourceClassifier::classify`] maps a raw string to a [`SourceKind`], and
//! [`parse_format`] maps a raw format token to an [`AudioFormat`].

use crate::config::SourceConfig;
use crate::types::{AudioFormat, SourceKind};
use url::Url;

/// Classifies submitted URLs against allow-listed domain substrings
#[derive(Clone, Debug)]
pub struct SourceClassifier {
    streaming_domains: Vec<String>,
    video_domains: Vec<String>,
}

impl SourceClassifier {
    /// Build a classifier from the configured domain lists
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            streaming_domains: lowercase_all(&config.streaming_domains),
            video_domains: lowercase_all(&config.video_domains),
        }
    }

    /// Classify a raw URL string
    ///
    /// A URL is accepted when it is non-empty, parses as an absolute URL with a
    /// host, uses `http` or `https`, and contains one of the allow-listed domain
    /// substrings. Streaming domains take precedence over video domains.
    pub fn classify(&self, raw: &str) -> SourceKind {
        let candidate = raw.trim().to_lowercase();
        if candidate.is_empty() {
            return SourceKind::Invalid;
        }

        let parsed = match Url::parse(&candidate) {
            Ok(url) => url,
            Err(_) => return SourceKind::Invalid,
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return SourceKind::Invalid;
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return SourceKind::Invalid;
        }

        if contains_any(&candidate, &self.streaming_domains) {
            SourceKind::Streaming
        } else if contains_any(&candidate, &self.video_domains) {
            SourceKind::VideoSite
        } else {
            SourceKind::Invalid
        }
    }
}

impl Default for SourceClassifier {
    fn default() -> Self {
        Self::new(&SourceConfig::default())
    }
}

/// Parse a requested output format (case-insensitive, surrounding whitespace ignored)
///
/// Returns `None` for anything outside `mp3`, `flac` and `wav`.
pub fn parse_format(raw: &str) -> Option<AudioFormat> {
    let token = raw.trim().to_lowercase();
    AudioFormat::ALL
        .into_iter()
        .find(|format| format.as_str() == token)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

fn lowercase_all(domains: &[String]) -> Vec<String> {
    domains
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}
