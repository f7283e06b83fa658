use regex::Regex;

use super::snapshot::{Space, Window};
use crate::common::collections::HashSet;
use crate::common::config::{ExclusionSource, SpacesSettings};
use crate::common::error::{Error, Result};

/// A compiled exclusion rule. Whether the configured text is a literal list
/// or a pattern is decided once, by configuration, not per entry.
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    Literal(HashSet<String>),
    /// `None` is an empty pattern, which never excludes anything.
    Pattern(Option<Regex>),
}

impl ExclusionRule {
    pub fn compile(source: &ExclusionSource, as_regex: bool) -> Result<Self> {
        if as_regex {
            let pattern = match source {
                ExclusionSource::Text(text) => text.clone(),
                ExclusionSource::List(items) => items
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("(?:{s})"))
                    .collect::<Vec<_>>()
                    .join("|"),
            };
            if pattern.is_empty() {
                return Ok(ExclusionRule::Pattern(None));
            }
            let regex = Regex::new(&pattern)
                .map_err(|source| Error::InvalidPattern { pattern: pattern.clone(), source })?;
            return Ok(ExclusionRule::Pattern(Some(regex)));
        }

        let items: HashSet<String> = match source {
            ExclusionSource::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            ExclusionSource::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        };
        Ok(ExclusionRule::Literal(items))
    }

    pub fn is_excluded(&self, identifier: &str) -> bool {
        match self {
            ExclusionRule::Literal(items) => items.contains(identifier),
            ExclusionRule::Pattern(Some(regex)) => regex.is_match(identifier),
            ExclusionRule::Pattern(None) => false,
        }
    }
}

impl Default for ExclusionRule {
    fn default() -> Self { ExclusionRule::Literal(HashSet::default()) }
}

/// One-shot form of [`ExclusionRule::compile`] + [`ExclusionRule::is_excluded`].
pub fn is_excluded(identifier: &str, source: &ExclusionSource, as_regex: bool) -> Result<bool> {
    Ok(ExclusionRule::compile(source, as_regex)?.is_excluded(identifier))
}

/// The exclusion rules of one configuration load.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    pub apps: ExclusionRule,
    pub titles: ExclusionRule,
    pub spaces: ExclusionRule,
}

impl Exclusions {
    pub fn from_settings(settings: &SpacesSettings) -> Result<Self> {
        let as_regex = settings.exclusions_as_regex;
        Ok(Self {
            apps: ExclusionRule::compile(&settings.exclusions, as_regex)?,
            titles: ExclusionRule::compile(&settings.title_exclusions, as_regex)?,
            spaces: ExclusionRule::compile(&settings.spaces_exclusions, as_regex)?,
        })
    }

    pub fn is_space_excluded(&self, space: &Space) -> bool { self.spaces.is_excluded(&space.key()) }
}

/// Whether `window` should be shown at all.
///
/// Native fullscreen windows are always shown, whatever the app and title
/// rules say. Otherwise the app must not be excluded, and the title must
/// either be empty or not excluded.
pub fn is_window_visible(window: &Window, exclusions: &Exclusions) -> bool {
    if window.native_fullscreen {
        return true;
    }
    if exclusions.apps.is_excluded(&window.app) {
        return false;
    }
    window.title.is_empty() || !exclusions.titles.is_excluded(&window.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::tests::{space, window};

    fn exclusions(apps: &str, titles: &str, as_regex: bool) -> Exclusions {
        Exclusions {
            apps: ExclusionRule::compile(&apps.into(), as_regex).unwrap(),
            titles: ExclusionRule::compile(&titles.into(), as_regex).unwrap(),
            spaces: ExclusionRule::default(),
        }
    }

    #[test]
    fn empty_pattern_never_excludes() {
        for id in ["x", "", "Finder", ".*"] {
            assert!(!is_excluded(id, &"".into(), true).unwrap());
        }
        assert!(!is_excluded("x", &ExclusionSource::List(Vec::new()), true).unwrap());
    }

    #[test]
    fn literal_membership() {
        let source = ExclusionSource::from("Finder, System Settings");
        assert!(is_excluded("Finder", &source, false).unwrap());
        assert!(is_excluded("System Settings", &source, false).unwrap());
        assert!(!is_excluded("Find", &source, false).unwrap());
        assert!(!is_excluded("", &source, false).unwrap());

        let list = ExclusionSource::from(vec!["Music", " Mail "]);
        assert!(is_excluded("Mail", &list, false).unwrap());
    }

    #[test]
    fn regex_matching() {
        assert!(is_excluded("Google Chrome", &"^Google".into(), true).unwrap());
        assert!(!is_excluded("Chrome", &"^Google".into(), true).unwrap());

        let list = ExclusionSource::from(vec!["^Mail$", "Music"]);
        assert!(is_excluded("Mail", &list, true).unwrap());
        assert!(is_excluded("Apple Music", &list, true).unwrap());
        assert!(!is_excluded("Mailbox", &list, true).unwrap());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = is_excluded("x", &"(unclosed".into(), true).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
        // The same text is fine as a literal.
        assert!(!is_excluded("x", &"(unclosed".into(), false).unwrap());
    }

    #[test]
    fn native_fullscreen_is_always_visible() {
        let rules = exclusions("Safari", "Secret", false);
        let mut w = window(1, "Safari", 1);
        w.title = "Secret".into();
        assert!(!is_window_visible(&w, &rules));
        w.native_fullscreen = true;
        assert!(is_window_visible(&w, &rules));
    }

    #[test]
    fn visibility_uses_app_and_title() {
        let rules = exclusions("Finder", "Preferences", false);

        let mut w = window(1, "Mail", 1);
        assert!(is_window_visible(&w, &rules));
        w.title = "Preferences".into();
        assert!(!is_window_visible(&w, &rules));
        w.title = "Inbox".into();
        assert!(is_window_visible(&w, &rules));

        let finder = window(2, "Finder", 1);
        assert!(!is_window_visible(&finder, &rules));
    }

    #[test]
    fn space_exclusion_uses_label_then_index() {
        let settings = SpacesSettings {
            spaces_exclusions: "scratch, 3".into(),
            ..SpacesSettings::default()
        };
        let rules = Exclusions::from_settings(&settings).unwrap();

        let mut labeled = space(1, 1);
        labeled.label = Some("scratch".into());
        assert!(rules.is_space_excluded(&labeled));

        let mut unlabeled = space(3, 1);
        unlabeled.label = Some(String::new());
        assert!(rules.is_space_excluded(&unlabeled));

        assert!(!rules.is_space_excluded(&space(2, 1)));
    }

    #[test]
    fn settings_with_bad_regex_fail_to_load() {
        let settings = SpacesSettings {
            title_exclusions: "[".into(),
            exclusions_as_regex: true,
            ..SpacesSettings::default()
        };
        assert!(matches!(
            Exclusions::from_settings(&settings),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
