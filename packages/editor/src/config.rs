//! # Editor Configuration
//!
//! Host-tunable settings. Every field has a default so a partial JSON object
//! (or none at all) is a valid configuration.

use crate::commands::{DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_WIDTH};
use crate::errors::{EditorError, EditorResult};
use folio_schema::DEFAULT_HIGHLIGHT_COLOR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    #[serde(default = "default_highlight_color")]
    pub default_highlight_color: String,

    /// URL schemes the toolbar accepts for links
    #[serde(default = "default_link_protocols")]
    pub link_protocols: Vec<String>,

    #[serde(default = "default_video_width")]
    pub video_width: u32,

    #[serde(default = "default_video_height")]
    pub video_height: u32,

    /// Keep an empty paragraph at the end of the document
    #[serde(default = "default_true")]
    pub trailing_paragraph: bool,
}

fn default_history_depth() -> usize {
    100
}

fn default_highlight_color() -> String {
    DEFAULT_HIGHLIGHT_COLOR.to_string()
}

fn default_link_protocols() -> Vec<String> {
    ["http", "https", "mailto", "tel"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_video_width() -> u32 {
    DEFAULT_VIDEO_WIDTH
}

fn default_video_height() -> u32 {
    DEFAULT_VIDEO_HEIGHT
}

fn default_true() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
            default_highlight_color: default_highlight_color(),
            link_protocols: default_link_protocols(),
            video_width: default_video_width(),
            video_height: default_video_height(),
            trailing_paragraph: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings that could never work
    pub fn check(&self) -> EditorResult<()> {
        if self.default_highlight_color.trim().is_empty() {
            return Err(EditorError::Config(
                "defaultHighlightColor must not be empty".to_string(),
            ));
        }
        if self.video_width == 0 || self.video_height == 0 {
            return Err(EditorError::Config(
                "videoWidth and videoHeight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a URL scheme is in the allow list (case-insensitive)
    pub fn allows_protocol(&self, scheme: &str) -> bool {
        self.link_protocols
            .iter()
            .any(|p| p.eq_ignore_ascii_case(scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.default_highlight_color, "#fef08a");
        assert_eq!((config.video_width, config.video_height), (640, 480));
        assert!(config.trailing_paragraph);
        assert!(config.allows_protocol("HTTPS"));
        assert!(!config.allows_protocol("ftp"));
    }

    #[test]
    fn test_partial_json() {
        let config = EditorConfig::from_json(r#"{"historyDepth": 5}"#).unwrap();
        assert_eq!(config.history_depth, 5);
        assert_eq!(config.link_protocols.len(), 4);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EditorConfig::from_json(r#"{"videoWidth": 0}"#),
            Err(EditorError::Config(_))
        ));
        assert!(matches!(
            EditorConfig::from_json("{"),
            Err(EditorError::Json(_))
        ));
    }
}
