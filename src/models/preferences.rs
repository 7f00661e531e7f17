//! Floating widget preferences

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    #[default]
    Style1,
    /// `style3` was folded into `style2`
    #[serde(alias = "style3")]
    Style2,
}

impl FromStr for SizePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(format!("Unknown size: {}. Use: small, medium, large", other)),
        }
    }
}

impl FromStr for StylePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "style1" => Ok(Self::Style1),
            "style2" | "style3" => Ok(Self::Style2),
            other => Err(format!("Unknown style: {}. Use: style1, style2", other)),
        }
    }
}

/// User-controlled, read-only to the engine apart from explicit updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetPreferences {
    pub size_preset: SizePreset,
    pub show_progress: bool,
    pub style_preset: StylePreset,
    pub hide_on_fullscreen: bool,
}

impl Default for WidgetPreferences {
    fn default() -> Self {
        Self {
            size_preset: SizePreset::Medium,
            show_progress: true,
            style_preset: StylePreset::Style1,
            hide_on_fullscreen: true,
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub size_preset: Option<SizePreset>,
    pub show_progress: Option<bool>,
    pub style_preset: Option<StylePreset>,
    pub hide_on_fullscreen: Option<bool>,
}

impl WidgetPreferences {
    pub fn merged(&self, update: &PreferencesUpdate) -> Self {
        Self {
            size_preset: update.size_preset.unwrap_or(self.size_preset),
            show_progress: update.show_progress.unwrap_or(self.show_progress),
            style_preset: update.style_preset.unwrap_or(self.style_preset),
            hide_on_fullscreen: update.hide_on_fullscreen.unwrap_or(self.hide_on_fullscreen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let prefs: WidgetPreferences = serde_json::from_str(r#"{"sizePreset": "large"}"#).unwrap();
        assert_eq!(prefs.size_preset, SizePreset::Large);
        assert!(prefs.show_progress);
        assert!(prefs.hide_on_fullscreen);
        assert_eq!(prefs.style_preset, StylePreset::Style1);
    }

    #[test]
    fn test_legacy_style3_reads_as_style2() {
        let prefs: WidgetPreferences = serde_json::from_str(r#"{"stylePreset": "style3"}"#).unwrap();
        assert_eq!(prefs.style_preset, StylePreset::Style2);
        assert!(serde_json::to_string(&prefs).unwrap().contains(r#""stylePreset":"style2""#));
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!("Large".parse::<SizePreset>(), Ok(SizePreset::Large));
        assert_eq!("style3".parse::<StylePreset>(), Ok(StylePreset::Style2));
        assert!("huge".parse::<SizePreset>().is_err());
    }

    #[test]
    fn test_merge_only_touches_given_fields() {
        let current = WidgetPreferences::default();
        let merged = current.merged(&PreferencesUpdate {
            show_progress: Some(false),
            ..Default::default()
        });
        assert!(!merged.show_progress);
        assert_eq!(merged.size_preset, SizePreset::Medium);
        assert_eq!(merged.hide_on_fullscreen, current.hide_on_fullscreen);
    }
}
