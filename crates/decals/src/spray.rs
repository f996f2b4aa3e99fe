//! Player sprays: the built-in catalog and request building.

use std::cmp::Ordering;
use std::time::Duration;

use glam::Vec3;

use crate::cache::{BACKGROUND_ALIAS_PREFIX, BACKGROUND_NAMESPACE};
use crate::kind::DecalKind;
use crate::loader::AssetSource;

/// Built-in sprays shown per wheel page.
pub const SPRAYS_PER_PAGE: usize = 7;
/// Label of the custom spray slot on the first page.
pub const CUSTOM_SLOT: &str = "Custom";
/// Time between sprays.
pub const SPRAY_COOLDOWN: Duration = Duration::from_secs(5);
/// Farthest surface a spray can reach, in meters.
pub const MAX_SPRAY_DISTANCE: f32 = 30.0;
pub const SPRAY_SIZE: f32 = 5.0;
/// Seconds before a spray fades.
pub const SPRAY_LIFETIME: f32 = 30.0;

/// Background names that never show up as sprays.
const EXCLUDED_NAMES: &[&str] = &["blood", "darkbackground"];

/// Sorted list of built-in spray keys (`BG:<name>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprayCatalog {
    keys: Vec<String>,
}

/// A selected wheel slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SprayChoice {
    BuiltIn(String),
    Custom,
}

impl SprayCatalog {
    /// Every background asset that is not blood or a dark background.
    #[must_use]
    pub fn from_source(assets: &dyn AssetSource) -> Self {
        Self::from_names(
            assets
                .load_all_by_namespace(BACKGROUND_NAMESPACE)
                .iter()
                .map(|texture| texture.name.as_str()),
        )
    }

    #[must_use]
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut names: Vec<&str> = names
            .into_iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                !EXCLUDED_NAMES.iter().any(|excluded| lower.contains(excluded))
            })
            .collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        names.dedup();
        Self {
            keys: names
                .into_iter()
                .map(|name| format!("{BACKGROUND_ALIAS_PREFIX}{name}"))
                .collect(),
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.keys.len().div_ceil(SPRAYS_PER_PAGE).max(1)
    }

    /// Wheel labels for `page`; the first page ends with [`CUSTOM_SLOT`].
    #[must_use]
    pub fn page(&self, page: usize) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .keys
            .iter()
            .skip(page * SPRAYS_PER_PAGE)
            .take(SPRAYS_PER_PAGE)
            .map(|key| key.strip_prefix(BACKGROUND_ALIAS_PREFIX).unwrap_or(key))
            .collect();
        if page == 0 {
            labels.push(CUSTOM_SLOT);
        }
        labels
    }

    /// Page after `page`, wrapping around.
    #[must_use]
    pub fn next_page(&self, page: usize) -> usize {
        (page + 1) % self.page_count()
    }

    /// Resolve a wheel slot. Slots past the built-in sprays are custom.
    #[must_use]
    pub fn select(&self, page: usize, slot: usize) -> SprayChoice {
        let slot = slot.min(SPRAYS_PER_PAGE);
        match self.keys.get(page * SPRAYS_PER_PAGE + slot) {
            Some(key) if slot < SPRAYS_PER_PAGE => SprayChoice::BuiltIn(key.clone()),
            _ => SprayChoice::Custom,
        }
    }
}

/// Orders names by their first number, then case-insensitively. Names
/// without a number sort before numbered ones.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    first_number(a)
        .cmp(&first_number(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn first_number(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: String = name[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Gate between sprays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SprayCooldown {
    ready_at: Duration,
}

impl SprayCooldown {
    #[must_use]
    pub fn is_ready(&self, now: Duration) -> bool {
        now >= self.ready_at
    }

    pub fn trigger(&mut self, now: Duration) {
        self.ready_at = now + SPRAY_COOLDOWN;
    }
}

/// A raycast hit on world geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub position: Vec3,
    pub normal: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// A spray ready to be requested.
#[derive(Debug, Clone, PartialEq)]
pub struct SprayIntent {
    pub kind: DecalKind,
    pub texture_key: String,
    pub position: Vec3,
    pub normal: Vec3,
    /// Camera up projected onto the surface plane.
    pub surface_up: Vec3,
}

impl SprayIntent {
    /// Build a spray for `choice` at `hit`.
    ///
    /// Custom sprays use `custom_key` and the solid spray kind so the image
    /// does not bleed. Returns `None` when the hit is out of reach or there
    /// is no key to spray.
    #[must_use]
    pub fn new(choice: &SprayChoice, custom_key: &str, hit: &SurfaceHit, camera_up: Vec3) -> Option<Self> {
        if hit.distance.is_nan() || hit.distance > MAX_SPRAY_DISTANCE {
            return None;
        }
        let (kind, key) = match choice {
            SprayChoice::BuiltIn(key) => (DecalKind::Spray, key.as_str()),
            SprayChoice::Custom => (DecalKind::SolidSpray, custom_key),
        };
        if key.is_empty() {
            return None;
        }
        let normal = decal_fit::surface_normal(hit.normal);
        Some(Self {
            kind,
            texture_key: key.to_string(),
            position: hit.position,
            normal,
            surface_up: (camera_up - camera_up.dot(normal) * normal).normalize_or_zero(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_filters_and_sorts() {
        let catalog = SprayCatalog::from_names([
            "MainBackground10Texture",
            "BloodSplat",
            "MainBackground2Texture",
            "DarkBackground1",
            "aurora",
            "Zebra",
        ]);
        assert_eq!(
            catalog.keys(),
            [
                "BG:aurora",
                "BG:Zebra",
                "BG:MainBackground2Texture",
                "BG:MainBackground10Texture",
            ]
        );
    }

    #[test]
    fn pages_hold_seven_with_custom_first() {
        let names: Vec<String> = (0..10).map(|i| format!("Bg{i}")).collect();
        let catalog = SprayCatalog::from_names(names.iter().map(String::as_str));
        assert_eq!(catalog.page_count(), 2);

        let first = catalog.page(0);
        assert_eq!(first.len(), 8);
        assert_eq!(first[0], "Bg0");
        assert_eq!(first[7], CUSTOM_SLOT);
        assert_eq!(catalog.page(1), ["Bg7", "Bg8", "Bg9"]);
        assert_eq!(catalog.next_page(1), 0);

        assert_eq!(catalog.select(0, 7), SprayChoice::Custom);
        assert_eq!(catalog.select(1, 2), SprayChoice::BuiltIn("BG:Bg9".to_string()));
        assert_eq!(catalog.select(1, 3), SprayChoice::Custom);
    }

    #[test]
    fn empty_catalog_has_one_page() {
        let catalog = SprayCatalog::default();
        assert_eq!(catalog.page_count(), 1);
        assert_eq!(catalog.page(0), [CUSTOM_SLOT]);
    }

    #[test]
    fn cooldown() {
        let mut cooldown = SprayCooldown::default();
        assert!(cooldown.is_ready(Duration::ZERO));
        cooldown.trigger(Duration::from_secs(1));
        assert!(!cooldown.is_ready(Duration::from_secs(5)));
        assert!(cooldown.is_ready(Duration::from_secs(6)));
    }

    #[test]
    fn intent_projects_camera_up() {
        let hit = SurfaceHit {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            distance: 10.0,
        };
        let camera_up = Vec3::new(0.0, 1.0, 1.0);
        let intent = SprayIntent::new(&SprayChoice::Custom, "https://example.com/s.png", &hit, camera_up)
            .unwrap();
        assert_eq!(intent.kind, DecalKind::SolidSpray);
        assert!(intent.surface_up.abs_diff_eq(Vec3::Y, 1e-6));

        let far = SurfaceHit { distance: 31.0, ..hit };
        assert!(SprayIntent::new(&SprayChoice::BuiltIn("BG:a".into()), "", &far, camera_up).is_none());
        assert!(SprayIntent::new(&SprayChoice::Custom, "", &hit, camera_up).is_none());
    }
}
