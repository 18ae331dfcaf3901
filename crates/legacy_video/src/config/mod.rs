//! Configuration system
//!
//! File-backed defaults plus the environment overrides the legacy
//! layer honored. Environment always wins over the loaded file.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Explicit window placement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOverride {
    /// Place the window's top-left corner at exact coordinates.
    At(i32, i32),
    /// Center the window on the display.
    Centered,
}

/// Settings for the video session.
///
/// Every field has an environment counterpart that takes priority:
/// `LEGACY_VIDEO_WINDOW_POS` (`"x,y"` or `"center"`),
/// `LEGACY_VIDEO_CENTERED`, `LEGACY_VIDEO_ALLOW_SCREENSAVER`, and
/// `LEGACY_VIDEO_FULLSCREEN_DISPLAY`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Fixed window x position, if any.
    pub window_x: Option<i32>,
    /// Fixed window y position, if any.
    pub window_y: Option<i32>,
    /// Center the window instead of using a fixed position.
    pub centered: bool,
    /// Display index used for fullscreen modes.
    pub display: usize,
    /// Explicit screensaver policy; `None` defers to the
    /// fullscreen-suppresses / windowed-allows rule.
    pub allow_screensaver: Option<bool>,
}

impl Config for VideoConfig {}

impl VideoConfig {
    /// Requested window placement, environment first.
    #[must_use]
    pub fn position_override(&self) -> Option<PositionOverride> {
        if let Ok(value) = std::env::var("LEGACY_VIDEO_WINDOW_POS") {
            if value.eq_ignore_ascii_case("center") {
                return Some(PositionOverride::Centered);
            }
            if let Some(pos) = parse_position(&value) {
                return Some(PositionOverride::At(pos.0, pos.1));
            }
        }
        if std::env::var_os("LEGACY_VIDEO_CENTERED").is_some() || self.centered {
            return Some(PositionOverride::Centered);
        }
        match (self.window_x, self.window_y) {
            (Some(x), Some(y)) => Some(PositionOverride::At(x, y)),
            _ => None,
        }
    }

    /// Screensaver policy for a mode: explicit override wins, then
    /// fullscreen suppresses and windowed allows.
    #[must_use]
    pub fn allow_screensaver(&self, fullscreen: bool) -> bool {
        if let Ok(value) = std::env::var("LEGACY_VIDEO_ALLOW_SCREENSAVER") {
            return value.trim().parse::<i32>().map_or(false, |v| v != 0);
        }
        self.allow_screensaver.unwrap_or(!fullscreen)
    }

    /// Display index used for fullscreen queries.
    #[must_use]
    pub fn display_index(&self) -> usize {
        std::env::var("LEGACY_VIDEO_FULLSCREEN_DISPLAY")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.display)
    }
}

fn parse_position(value: &str) -> Option<(i32, i32)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
