// src/protocol/settings.rs

//! Per-client delivery preferences.
//!
//! A client only ever stores a *partial* [`Settings`]: every field it has not
//! set explicitly falls back to the process-wide defaults, which are always a
//! fully-resolved [`EffectiveSettings`].

use serde::{Deserialize, Serialize};

/// Partial settings as sent by a client (or stored for it).
///
/// `None` means "unset, use the default", not "false".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_paths: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_contents: Option<bool>,
}

impl Settings {
    pub fn is_empty(&self) -> bool {
        self.base_path.is_none() && self.relative_paths.is_none() && self.with_contents.is_none()
    }

    /// Overwrite the fields that are set in `update`; leave the rest alone.
    pub fn merge(&mut self, update: &Settings) {
        if let Some(base_path) = &update.base_path {
            self.base_path = Some(base_path.clone());
        }
        if let Some(relative_paths) = update.relative_paths {
            self.relative_paths = Some(relative_paths);
        }
        if let Some(with_contents) = update.with_contents {
            self.with_contents = Some(with_contents);
        }
    }

    /// Resolve every unset field against `defaults`.
    pub fn resolve(&self, defaults: &EffectiveSettings) -> EffectiveSettings {
        EffectiveSettings {
            base_path: self
                .base_path
                .clone()
                .unwrap_or_else(|| defaults.base_path.clone()),
            relative_paths: self.relative_paths.unwrap_or(defaults.relative_paths),
            with_contents: self.with_contents.unwrap_or(defaults.with_contents),
        }
    }
}

/// Fully-resolved settings. Also used for the process-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSettings {
    pub base_path: String,
    pub relative_paths: bool,
    pub with_contents: bool,
}

impl EffectiveSettings {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            relative_paths: false,
            with_contents: false,
        }
    }

    pub fn with_relative_paths(mut self, relative_paths: bool) -> Self {
        self.relative_paths = relative_paths;
        self
    }

    pub fn with_file_contents(mut self, with_contents: bool) -> Self {
        self.with_contents = with_contents;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> EffectiveSettings {
        EffectiveSettings::new("/default")
    }

    #[test]
    fn merge_keeps_fields_missing_from_update() {
        let mut settings = Settings::default();
        settings.merge(&Settings {
            relative_paths: Some(true),
            ..Settings::default()
        });
        settings.merge(&Settings {
            with_contents: Some(true),
            ..Settings::default()
        });

        assert_eq!(settings.relative_paths, Some(true));
        assert_eq!(settings.with_contents, Some(true));
        assert_eq!(settings.base_path, None);
    }

    #[test]
    fn merge_overwrites_explicit_fields() {
        let mut settings = Settings {
            base_path: Some("/a".into()),
            relative_paths: Some(true),
            with_contents: None,
        };
        settings.merge(&Settings {
            base_path: Some("/b".into()),
            relative_paths: Some(false),
            with_contents: None,
        });
        assert_eq!(settings.base_path.as_deref(), Some("/b"));
        assert_eq!(settings.relative_paths, Some(false));
    }

    #[test]
    fn resolve_falls_back_per_field() {
        let settings = Settings {
            relative_paths: Some(true),
            ..Settings::default()
        };
        let effective = settings.resolve(&defaults());
        assert_eq!(
            effective,
            EffectiveSettings {
                base_path: "/default".into(),
                relative_paths: true,
                with_contents: false,
            }
        );
    }

    #[test]
    fn partial_settings_deserialize_from_camel_case() {
        let parsed: Settings = serde_json::from_str(r#"{"withContents":true}"#).unwrap();
        assert_eq!(
            parsed,
            Settings {
                with_contents: Some(true),
                ..Settings::default()
            }
        );
        assert!(serde_json::from_str::<Settings>("{}").unwrap().is_empty());
    }
}
