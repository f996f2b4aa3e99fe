//! Decal settings.

use serde::Deserialize;

use crate::error::Result;

/// Default download limit for URL textures.
pub const DEFAULT_TEXTURE_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Read-only view of the settings the decal system consults.
///
/// Values are read on every request, so providers backed by a live settings
/// store take effect immediately.
pub trait SettingsProvider: Send + Sync {
    /// Global cap for the ambient kind; zero or negative disables it.
    fn max_count(&self) -> i32;
    /// Per-owner cap; values below one are treated as one.
    fn per_owner_max(&self) -> i32;
    /// Distance beyond which decals are hidden; zero or negative disables
    /// culling.
    fn render_distance(&self) -> f32;
    /// Whether downloaded textures get mipmaps.
    fn mipmaps(&self) -> bool;
    /// Whether players may spray.
    fn sprays_enabled(&self) -> bool {
        true
    }
    /// Download limit for URL textures in bytes.
    fn texture_size_limit(&self) -> usize {
        DEFAULT_TEXTURE_SIZE_LIMIT
    }
}

/// Settings for the decal system.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecalSettings {
    /// Global cap for ambient decals.
    pub max_count: i32,
    /// Per-owner cap.
    pub per_owner_max: i32,
    /// Render distance in meters.
    pub render_distance: f32,
    /// Generate mipmaps for downloaded textures.
    pub mipmaps: bool,
    /// Allow sprays.
    pub sprays_enabled: bool,
    /// Download limit for URL textures in bytes.
    pub texture_size_limit: usize,
}

impl Default for DecalSettings {
    fn default() -> Self {
        Self {
            max_count: 100,
            per_owner_max: 10,
            render_distance: 150.0,
            mipmaps: true,
            sprays_enabled: true,
            texture_size_limit: DEFAULT_TEXTURE_SIZE_LIMIT,
        }
    }
}

impl DecalSettings {
    /// Parse settings from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SettingsProvider for DecalSettings {
    fn max_count(&self) -> i32 {
        self.max_count
    }

    fn per_owner_max(&self) -> i32 {
        self.per_owner_max
    }

    fn render_distance(&self) -> f32 {
        self.render_distance
    }

    fn mipmaps(&self) -> bool {
        self.mipmaps
    }

    fn sprays_enabled(&self) -> bool {
        self.sprays_enabled
    }

    fn texture_size_limit(&self) -> usize {
        self.texture_size_limit
    }
}

/// Cap values resolved from a [`SettingsProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Global cap for the ambient kind, `None` when unlimited.
    pub global_max: Option<usize>,
    /// Per-owner cap, at least one.
    pub per_owner_max: usize,
}

impl Limits {
    #[must_use]
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self {
            global_max: usize::try_from(settings.max_count())
                .ok()
                .filter(|&max| max > 0),
            per_owner_max: usize::try_from(settings.per_owner_max())
                .unwrap_or(0)
                .max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_defaults() {
        let settings = DecalSettings::from_json_str(r#"{ "max_count": 5, "mipmaps": false }"#)
            .unwrap();
        assert_eq!(settings.max_count, 5);
        assert!(!settings.mipmaps);
        assert_eq!(settings.per_owner_max, DecalSettings::default().per_owner_max);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(DecalSettings::from_json_str("{ max_count: }").is_err());
    }

    #[test]
    fn limits_clamp_values() {
        let settings = DecalSettings {
            max_count: 0,
            per_owner_max: -3,
            ..DecalSettings::default()
        };
        let limits = Limits::from_settings(&settings);
        assert_eq!(limits.global_max, None);
        assert_eq!(limits.per_owner_max, 1);

        let settings = DecalSettings {
            max_count: 2,
            per_owner_max: 4,
            ..DecalSettings::default()
        };
        let limits = Limits::from_settings(&settings);
        assert_eq!(limits.global_max, Some(2));
        assert_eq!(limits.per_owner_max, 4);
    }
}
