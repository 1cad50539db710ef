//! TOML configuration: scales, key bindings and navigation behaviour.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{AnnotatorError, Result};
use crate::scale::{Category, InputKey, LabelScale, Rgb};
use crate::session::IncompletePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationKeys {
    pub next: InputKey,
    pub previous: InputKey,
}

impl Default for NavigationKeys {
    fn default() -> Self {
        Self {
            next: InputKey::ArrowRight,
            previous: InputKey::ArrowLeft,
        }
    }
}

/// One scale as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// Column prefix in the annotations file.
    pub key: String,
    pub title: String,
    pub colors: Vec<String>,
    /// Optional display names; defaults to 1-based numbers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Key per category; may be shorter than `colors`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<InputKey>,
}

impl From<&LabelScale> for ScaleConfig {
    fn from(scale: &LabelScale) -> Self {
        let keys: Vec<InputKey> = scale.categories.iter().map_while(|c| c.key).collect();
        Self {
            key: scale.key.clone(),
            title: scale.title.clone(),
            colors: scale.categories.iter().map(|c| c.color.clone()).collect(),
            names: scale.categories.iter().map(|c| c.name.clone()).collect(),
            keys,
        }
    }
}

impl ScaleConfig {
    fn to_scale(&self) -> Result<LabelScale> {
        if self.key.trim().is_empty() {
            return Err(AnnotatorError::Config("scale with empty key".into()));
        }
        if self.colors.is_empty() {
            return Err(AnnotatorError::Config(format!(
                "scale '{}' has no categories",
                self.key
            )));
        }
        if self.keys.len() > self.colors.len() {
            return Err(AnnotatorError::Config(format!(
                "scale '{}' binds {} keys to {} categories",
                self.key,
                self.keys.len(),
                self.colors.len()
            )));
        }
        let categories = self
            .colors
            .iter()
            .enumerate()
            .map(|(i, color)| {
                if Rgb::from_hex(color).is_none() {
                    return Err(AnnotatorError::Config(format!(
                        "scale '{}': '{color}' is not a #RRGGBB color",
                        self.key
                    )));
                }
                Ok(Category {
                    name: self
                        .names
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("{}", i + 1)),
                    color: color.to_uppercase(),
                    key: self.keys.get(i).copied(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LabelScale::new(self.key.trim(), &self.title, categories))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub incomplete_policy: IncompletePolicy,
    #[serde(default)]
    pub navigation: NavigationKeys,
    #[serde(default = "default_scale_configs")]
    pub scales: Vec<ScaleConfig>,
}

fn default_scale_configs() -> Vec<ScaleConfig> {
    crate::scale::default_scales()
        .iter()
        .map(ScaleConfig::from)
        .collect()
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            incomplete_policy: IncompletePolicy::default(),
            navigation: NavigationKeys::default(),
            scales: default_scale_configs(),
        }
    }
}

impl AnnotatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| AnnotatorError::Config(e.to_string()))?;
        config.label_scales()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AnnotatorError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| AnnotatorError::from_io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Defaults when the file is missing; a broken file is logged and
    /// ignored.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| AnnotatorError::from_io(dir, e))?;
        }
        let text = self.to_toml_string()?;
        fs::write(path, text).map_err(|e| AnnotatorError::from_io(path, e))
    }

    /// Validated scales. Column prefixes and keys must be unique, and no
    /// picker key may shadow a navigation key.
    pub fn label_scales(&self) -> Result<Vec<LabelScale>> {
        if self.scales.is_empty() {
            return Err(AnnotatorError::Config("no scales configured".into()));
        }
        if self.navigation.next == self.navigation.previous {
            return Err(AnnotatorError::Config(format!(
                "'{}' is bound to both next and previous",
                self.navigation.next
            )));
        }
        let scales = self
            .scales
            .iter()
            .map(ScaleConfig::to_scale)
            .collect::<Result<Vec<_>>>()?;

        let mut prefixes = HashSet::new();
        let mut keys = HashSet::from([self.navigation.next, self.navigation.previous]);
        for scale in &scales {
            if !prefixes.insert(scale.key.as_str()) {
                return Err(AnnotatorError::Config(format!(
                    "scale '{}' is defined twice",
                    scale.key
                )));
            }
            for key in scale.categories.iter().filter_map(|c| c.key) {
                if !keys.insert(key) {
                    return Err(AnnotatorError::Config(format!("key '{key}' is bound twice")));
                }
            }
        }
        Ok(scales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::default_scales;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn default_config_uses_builtin_scales() -> Result<()> {
        let config = AnnotatorConfig::default();
        assert_eq!(config.label_scales()?, default_scales());
        assert_eq!(config.incomplete_policy, IncompletePolicy::Drop);
        Ok(())
    }

    #[test]
    fn empty_file_means_defaults() -> Result<()> {
        let config = AnnotatorConfig::from_toml_str("")?;
        assert_eq!(config, AnnotatorConfig::default());
        Ok(())
    }

    #[test]
    fn parses_custom_scale() -> Result<()> {
        let config = AnnotatorConfig::from_toml_str(
            r##"
log_level = "debug"
incomplete_policy = "block"

[navigation]
next = "D"
previous = "A"

[[scales]]
key = "tone"
title = "Tone"
colors = ["#ffffff", "#000000", "#808080"]
keys = ["1", "2"]
"##,
        )?;
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.incomplete_policy, IncompletePolicy::Block);
        assert_eq!(config.navigation.next, InputKey::Letter('D'));

        let scales = config.label_scales()?;
        assert_eq!(scales.len(), 1);
        assert_eq!(scales[0].color_of(0), Some("#FFFFFF"));
        assert_eq!(scales[0].index_for_key(InputKey::Digit(2)), Some(1));
        assert_eq!(scales[0].category(2).and_then(|c| c.key), None);
        assert_eq!(scales[0].category(2).map(|c| c.name.as_str()), Some("3"));
        Ok(())
    }

    #[test]
    fn rejects_bad_colors_and_duplicate_keys() {
        let bad_color = r##"
[[scales]]
key = "tone"
title = "Tone"
colors = ["white"]
"##;
        assert!(AnnotatorConfig::from_toml_str(bad_color).is_err());

        let shadowed = r##"
[[scales]]
key = "tone"
title = "Tone"
colors = ["#FFFFFF", "#000000"]
keys = ["ArrowRight"]
"##;
        assert!(AnnotatorConfig::from_toml_str(shadowed).is_err());

        let mut twice = AnnotatorConfig::default();
        twice.scales.push(twice.scales[0].clone());
        assert!(twice.label_scales().is_err());
    }

    #[test]
    fn save_then_load_keeps_settings() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AnnotatorConfig::default();
        config.incomplete_policy = IncompletePolicy::Warn;
        config.save(&path)?;
        assert_eq!(AnnotatorConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn broken_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "scales = 3")?;
        assert_eq!(AnnotatorConfig::load_or_default(&path), AnnotatorConfig::default());
        assert_eq!(
            AnnotatorConfig::load_or_default(dir.path().join("missing.toml")),
            AnnotatorConfig::default()
        );
        Ok(())
    }
}
