//! Per-turn context bundle with tagged per-slot payloads.
//!
//! The surrounding application assembles a raw [`ContextBundle`] for each
//! turn; the relevance filter produces a [`FilteredContext`] that is always
//! a key-subset of the raw bundle. Slots are a closed enum so filter logic
//! can match exhaustively; adding a slot is a compile-time event, not a
//! runtime surprise.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of filterable context slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    OwnedVehicles,
    Location,
    CurrentSubjectVehicle,
    UserProfile,
    Favorites,
}

impl SlotKey {
    /// All slot keys, in the order the filter evaluates them.
    pub const ALL: [SlotKey; 5] = [
        SlotKey::OwnedVehicles,
        SlotKey::Location,
        SlotKey::CurrentSubjectVehicle,
        SlotKey::UserProfile,
        SlotKey::Favorites,
    ];

    /// Stable label used in logs and filter traces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnedVehicles => "owned_vehicles",
            Self::Location => "location",
            Self::CurrentSubjectVehicle => "current_subject_vehicle",
            Self::UserProfile => "user_profile",
            Self::Favorites => "favorites",
        }
    }
}

/// A reference to a concrete vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRef {
    pub year: u16,
    pub make: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
}

impl VehicleRef {
    /// Create a vehicle reference without a trim.
    pub fn new(year: u16, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            year,
            make: make.into(),
            model: model.into(),
            trim: None,
        }
    }

    /// Human-readable label, e.g. "2018 Subaru WRX STI".
    pub fn label(&self) -> String {
        match &self.trim {
            Some(trim) => format!("{} {} {} {}", self.year, self.make, self.model, trim),
            None => format!("{} {} {}", self.year, self.make, self.model),
        }
    }
}

/// User location, city granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub city: String,
    pub region: String,
}

/// Profile details relevant to response tone and depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

/// Lightweight aggregate counts; always forwarded, never filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageStats {
    pub owned_count: u32,
    pub favorite_count: u32,
}

/// Typed payload for one context slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum SlotPayload {
    OwnedVehicles { vehicles: Vec<VehicleRef> },
    Location { location: LocationInfo },
    CurrentSubjectVehicle { vehicle: VehicleRef },
    UserProfile { profile: UserProfile },
    Favorites { vehicles: Vec<VehicleRef> },
}

impl SlotPayload {
    /// The slot this payload belongs to.
    pub fn key(&self) -> SlotKey {
        match self {
            Self::OwnedVehicles { .. } => SlotKey::OwnedVehicles,
            Self::Location { .. } => SlotKey::Location,
            Self::CurrentSubjectVehicle { .. } => SlotKey::CurrentSubjectVehicle,
            Self::UserProfile { .. } => SlotKey::UserProfile,
            Self::Favorites { .. } => SlotKey::Favorites,
        }
    }

    /// Whether the payload carries no usable data.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::OwnedVehicles { vehicles } | Self::Favorites { vehicles } => vehicles.is_empty(),
            Self::Location { .. } | Self::CurrentSubjectVehicle { .. } => false,
            Self::UserProfile { profile } => {
                profile.display_name.is_none() && profile.experience_level.is_none()
            }
        }
    }

    /// Render the payload as a prompt fragment.
    pub fn render(&self) -> String {
        match self {
            Self::OwnedVehicles { vehicles } => format!(
                "Owned vehicles: {}",
                vehicles
                    .iter()
                    .map(VehicleRef::label)
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            Self::Location { location } => {
                format!("Location: {}, {}", location.city, location.region)
            }
            Self::CurrentSubjectVehicle { vehicle } => {
                format!("Vehicle under discussion: {}", vehicle.label())
            }
            Self::UserProfile { profile } => {
                let mut parts = Vec::new();
                if let Some(name) = &profile.display_name {
                    parts.push(format!("name {}", name));
                }
                if let Some(level) = &profile.experience_level {
                    parts.push(format!("experience {}", level));
                }
                format!("User profile: {}", parts.join(", "))
            }
            Self::Favorites { vehicles } => format!(
                "Saved favorites: {}",
                vehicles
                    .iter()
                    .map(VehicleRef::label)
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    }
}

/// The raw context assembled by the caller for one turn.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    slots: HashMap<SlotKey, SlotPayload>,
    /// What page the user is on; always forwarded.
    pub page_context: Option<String>,
    /// Aggregate garage counts; always forwarded.
    pub garage_stats: Option<GarageStats>,
}

impl ContextBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot payload, keyed by the payload's own slot.
    pub fn set(&mut self, payload: SlotPayload) {
        self.slots.insert(payload.key(), payload);
    }

    /// Builder-style slot setter.
    pub fn with(mut self, payload: SlotPayload) -> Self {
        self.set(payload);
        self
    }

    /// Get a slot payload, if present.
    pub fn get(&self, key: SlotKey) -> Option<&SlotPayload> {
        self.slots.get(&key)
    }

    /// Whether a slot is present and non-empty.
    pub fn has(&self, key: SlotKey) -> bool {
        self.slots.get(&key).map(|p| !p.is_empty()).unwrap_or(false)
    }
}

/// The filtered subset of a raw bundle forwarded to a specialist.
#[derive(Debug, Clone, Default)]
pub struct FilteredContext {
    slots: HashMap<SlotKey, SlotPayload>,
    pub page_context: Option<String>,
    pub garage_stats: Option<GarageStats>,
}

impl FilteredContext {
    /// Create a filtered context carrying the bundle's always-included fields.
    pub fn carrying(bundle: &ContextBundle) -> Self {
        Self {
            slots: HashMap::new(),
            page_context: bundle.page_context.clone(),
            garage_stats: bundle.garage_stats,
        }
    }

    /// Copy a slot over from the raw bundle.
    pub fn include(&mut self, bundle: &ContextBundle, key: SlotKey) {
        if let Some(payload) = bundle.get(key) {
            self.slots.insert(key, payload.clone());
        }
    }

    /// Get an included slot payload.
    pub fn get(&self, key: SlotKey) -> Option<&SlotPayload> {
        self.slots.get(&key)
    }

    /// Keys included by the filter.
    pub fn slot_keys(&self) -> Vec<SlotKey> {
        SlotKey::ALL
            .iter()
            .copied()
            .filter(|k| self.slots.contains_key(k))
            .collect()
    }

    /// Invariant check: every included slot exists in the raw bundle.
    pub fn is_subset_of(&self, bundle: &ContextBundle) -> bool {
        self.slots.keys().all(|k| bundle.get(*k).is_some())
    }

    /// Render the included context as a prompt fragment.
    ///
    /// Returns an empty string when there is nothing to say, so callers can
    /// skip the section entirely.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(page) = &self.page_context {
            lines.push(format!("Current page: {}", page));
        }
        if let Some(stats) = &self.garage_stats {
            lines.push(format!(
                "Garage: {} owned, {} favorites",
                stats.owned_count, stats.favorite_count
            ));
        }
        for key in SlotKey::ALL {
            if let Some(payload) = self.slots.get(&key) {
                lines.push(payload.render());
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> ContextBundle {
        ContextBundle::new()
            .with(SlotPayload::OwnedVehicles {
                vehicles: vec![VehicleRef::new(2018, "Subaru", "WRX")],
            })
            .with(SlotPayload::Location {
                location: LocationInfo {
                    city: "Denver".to_string(),
                    region: "CO".to_string(),
                },
            })
    }

    #[test]
    fn test_set_and_get_by_payload_key() {
        let bundle = sample_bundle();
        assert!(bundle.has(SlotKey::OwnedVehicles));
        assert!(bundle.has(SlotKey::Location));
        assert!(!bundle.has(SlotKey::Favorites));
    }

    #[test]
    fn test_empty_payload_is_not_present() {
        let bundle = ContextBundle::new().with(SlotPayload::OwnedVehicles {
            vehicles: Vec::new(),
        });
        assert!(!bundle.has(SlotKey::OwnedVehicles));
    }

    #[test]
    fn test_filtered_subset_invariant() {
        let bundle = sample_bundle();
        let mut filtered = FilteredContext::carrying(&bundle);
        filtered.include(&bundle, SlotKey::OwnedVehicles);

        assert!(filtered.is_subset_of(&bundle));
        assert_eq!(filtered.slot_keys(), vec![SlotKey::OwnedVehicles]);
    }

    #[test]
    fn test_include_missing_slot_is_noop() {
        let bundle = sample_bundle();
        let mut filtered = FilteredContext::carrying(&bundle);
        filtered.include(&bundle, SlotKey::Favorites);
        assert!(filtered.slot_keys().is_empty());
    }

    #[test]
    fn test_carrying_preserves_always_included_fields() {
        let mut bundle = sample_bundle();
        bundle.page_context = Some("vehicle/2018-subaru-wrx".to_string());
        bundle.garage_stats = Some(GarageStats {
            owned_count: 1,
            favorite_count: 3,
        });

        let filtered = FilteredContext::carrying(&bundle);
        let rendered = filtered.render();
        assert!(rendered.contains("Current page"));
        assert!(rendered.contains("1 owned, 3 favorites"));
    }

    #[test]
    fn test_render_vehicle_labels() {
        let mut vehicle = VehicleRef::new(2018, "Subaru", "WRX");
        assert_eq!(vehicle.label(), "2018 Subaru WRX");
        vehicle.trim = Some("STI".to_string());
        assert_eq!(vehicle.label(), "2018 Subaru WRX STI");
    }

    #[test]
    fn test_render_empty_filtered_context() {
        let bundle = ContextBundle::new();
        let filtered = FilteredContext::carrying(&bundle);
        assert!(filtered.render().is_empty());
    }
}
