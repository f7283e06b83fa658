use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::debug;

use crate::model::order::IconOrder;

const DEFAULT_SLIDING_PACE: f64 = 4.0;

pub fn config_dir() -> Option<PathBuf> { dirs::home_dir().map(|h| h.join(".config").join("spacebar")) }
pub fn config_file() -> Option<PathBuf> { config_dir().map(|d| d.join("config.toml")) }

/// Raw exclusion configuration. Either a comma separated string or a list;
/// in regex mode the string is the pattern and list entries are alternated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExclusionSource {
    Text(String),
    List(Vec<String>),
}

impl Default for ExclusionSource {
    fn default() -> Self { ExclusionSource::Text(String::new()) }
}

impl From<&str> for ExclusionSource {
    fn from(s: &str) -> Self { ExclusionSource::Text(s.to_string()) }
}

impl From<Vec<&str>> for ExclusionSource {
    fn from(v: Vec<&str>) -> Self { ExclusionSource::List(v.into_iter().map(String::from).collect()) }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub spaces: SpacesSettings,
    #[serde(default)]
    pub navigation: NavigationSettings,
    #[serde(default)]
    pub pacing: PacingSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpacesSettings {
    /// App names whose windows are hidden from the bar.
    #[serde(default)]
    pub exclusions: ExclusionSource,
    /// Window titles hidden from the bar.
    #[serde(default)]
    pub title_exclusions: ExclusionSource,
    /// Space labels (or indices for unlabeled spaces) hidden from the bar.
    #[serde(default)]
    pub spaces_exclusions: ExclusionSource,
    #[serde(default = "no")]
    pub exclusions_as_regex: bool,
    /// Collapse windows of the same app into one icon.
    #[serde(default = "no")]
    pub unique_apps: bool,
    #[serde(default = "no")]
    pub display_sticky_windows_separately: bool,
    #[serde(default)]
    pub icon_order: IconOrder,
}

impl Default for SpacesSettings {
    fn default() -> Self {
        Self {
            exclusions: ExclusionSource::default(),
            title_exclusions: ExclusionSource::default(),
            spaces_exclusions: ExclusionSource::default(),
            exclusions_as_regex: false,
            unique_apps: false,
            display_sticky_windows_separately: false,
            icon_order: IconOrder::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NavigationSettings {
    #[serde(default = "default_osascript")]
    pub osascript: PathBuf,
}

impl Default for NavigationSettings {
    fn default() -> Self { Self { osascript: default_osascript() } }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PacingSettings {
    /// Quiet period before a burst of snapshots triggers one refresh.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_refresh_debounce", rename = "refresh_debounce_ms")]
    pub refresh_debounce: Duration,
    /// Upper bound on how long a continuous burst may defer a refresh.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default = "default_refresh_max_wait", rename = "refresh_max_wait_ms")]
    pub refresh_max_wait: Option<Duration>,
    /// Pixels per 100ms of the label sliding animation.
    #[serde(default = "default_sliding_pace")]
    pub sliding_animation_pace: f64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            refresh_debounce: default_refresh_debounce(),
            refresh_max_wait: default_refresh_max_wait(),
            sliding_animation_pace: default_sliding_pace(),
        }
    }
}

impl PacingSettings {
    /// Duration of the sliding animation for content overflowing its
    /// container by `overflow_px`. `None` when the content fits.
    pub fn slide_duration(&self, overflow_px: f64) -> Option<Duration> {
        if overflow_px <= 0.0 {
            return None;
        }
        let pace = if self.sliding_animation_pace < 1.0 {
            DEFAULT_SLIDING_PACE
        } else {
            self.sliding_animation_pace.trunc()
        };
        let ms = (overflow_px.abs() * 100.0 / pace).round();
        Some(Duration::from_millis(ms as u64))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.sliding_animation_pace < 1.0 {
            issues.push("sliding_animation_pace must be at least 1".to_string());
        }
        if let Some(max_wait) = self.refresh_max_wait
            && max_wait < self.refresh_debounce
        {
            issues.push(
                "refresh_max_wait_ms must not be shorter than refresh_debounce_ms".to_string(),
            );
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.sliding_animation_pace < 1.0 {
            self.sliding_animation_pace = default_sliding_pace();
            fixes += 1;
        }
        if let Some(max_wait) = self.refresh_max_wait
            && max_wait < self.refresh_debounce
        {
            self.refresh_max_wait = Some(self.refresh_debounce);
            fixes += 1;
        }
        fixes
    }
}

fn no() -> bool { false }

fn default_osascript() -> PathBuf { PathBuf::from("osascript") }

fn default_refresh_debounce() -> Duration { Duration::from_millis(150) }

fn default_refresh_max_wait() -> Option<Duration> { Some(Duration::from_millis(1000)) }

fn default_sliding_pace() -> f64 { DEFAULT_SLIDING_PACE }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if given, otherwise the default config file when it
    /// exists, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        if let Some(path) = path {
            return Self::read(path);
        }
        match config_file() {
            Some(path) if path.exists() => Self::read(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.pacing.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize { self.pacing.auto_fix_values() }

    pub(crate) fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn exclusions_accept_string_or_list() {
        let config = Config::parse(
            r#"
            [spaces]
            exclusions = "Finder, Calendar"
            title_exclusions = ["Picture in Picture", "Preferences"]
            exclusions_as_regex = false
            unique_apps = true
            icon_order = "stack"

            [pacing]
            refresh_debounce_ms = 200
            refresh_max_wait_ms = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.spaces.exclusions, ExclusionSource::from("Finder, Calendar"));
        assert_eq!(
            config.spaces.title_exclusions,
            ExclusionSource::from(vec!["Picture in Picture", "Preferences"])
        );
        assert!(config.spaces.unique_apps);
        assert_eq!(config.spaces.icon_order, IconOrder::Stack);
        assert_eq!(config.pacing.refresh_debounce, Duration::from_millis(200));
        assert_eq!(config.pacing.refresh_max_wait, Some(Duration::from_millis(600)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[spaces]\nbogus = 1\n").is_err());
    }

    #[test]
    fn validation_and_auto_fix() {
        let mut config = Config::default();
        config.pacing.sliding_animation_pace = 0.0;
        config.pacing.refresh_max_wait = Some(Duration::from_millis(10));

        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("sliding_animation_pace"));

        assert_eq!(config.auto_fix_values(), 2);
        assert!(config.validate().is_empty());
        assert_eq!(config.pacing.sliding_animation_pace, 4.0);
        assert_eq!(config.pacing.refresh_max_wait, Some(config.pacing.refresh_debounce));
    }

    #[test]
    fn slide_duration_follows_pace() {
        let mut pacing = PacingSettings::default();
        assert_eq!(pacing.slide_duration(0.0), None);
        assert_eq!(pacing.slide_duration(-12.0), None);
        assert_eq!(pacing.slide_duration(40.0), Some(Duration::from_millis(1000)));

        pacing.sliding_animation_pace = 0.5;
        assert_eq!(pacing.slide_duration(40.0), Some(Duration::from_millis(1000)));

        pacing.sliding_animation_pace = 8.0;
        assert_eq!(pacing.slide_duration(40.0), Some(Duration::from_millis(500)));
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[navigation]\nosascript = \"/usr/bin/osascript\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.navigation.osascript, PathBuf::from("/usr/bin/osascript"));
    }
}
