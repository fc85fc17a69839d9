//! Context relevance filtering.
//!
//! Forwarding every context slot into every request is the single biggest
//! avoidable token cost in the pipeline. A static intent x slot matrix
//! decides the baseline disposition; per-slot boost patterns on the
//! message text force inclusion when the user's wording carries a
//! personalization signal the classifier missed ("my car", "near me").
//!
//! Both enums are matched exhaustively: adding an intent or a slot will
//! not compile until this matrix says what to do with it.

use assistant_core::{ContextBundle, FilteredContext, SlotKey};
use regex::Regex;

use crate::intent::Intent;

/// Baseline disposition of one slot for one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Core to the intent; include whenever data exists.
    Always,
    /// Irrelevant to the intent; include only on a boost match.
    Never,
    /// Useful when present; include whenever data exists.
    IfAvailable,
    /// Include when data exists and a boost or the slot's secondary
    /// condition holds.
    Conditional,
}

/// Why a slot was included or excluded, for observability only.
#[derive(Debug, Clone)]
pub struct SlotDecision {
    pub slot: SlotKey,
    pub included: bool,
    pub reason: &'static str,
}

/// Per-slot decisions for one filtered request.
#[derive(Debug, Clone, Default)]
pub struct FilterTrace {
    pub decisions: Vec<SlotDecision>,
}

impl FilterTrace {
    /// Compact single-line summary for logging.
    pub fn summary(&self) -> String {
        self.decisions
            .iter()
            .map(|d| {
                format!(
                    "{}{}({})",
                    if d.included { "+" } else { "-" },
                    d.slot.as_str(),
                    d.reason
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of one filter pass: the forwarded subset plus its trace.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub context: FilteredContext,
    pub trace: FilterTrace,
}

/// The static relevance matrix.
fn disposition(intent: Intent, slot: SlotKey) -> Disposition {
    use Disposition::*;
    match slot {
        SlotKey::OwnedVehicles => match intent {
            Intent::PartsLookup | Intent::BuildPlanning | Intent::Maintenance => Always,
            Intent::Vision | Intent::General => IfAvailable,
            Intent::CarShopping | Intent::Specs | Intent::Clarify => Never,
        },
        SlotKey::Location => match intent {
            Intent::CarShopping => Always,
            Intent::Maintenance => IfAvailable,
            Intent::Vision
            | Intent::PartsLookup
            | Intent::BuildPlanning
            | Intent::Specs
            | Intent::Clarify
            | Intent::General => Never,
        },
        SlotKey::CurrentSubjectVehicle => match intent {
            Intent::PartsLookup | Intent::BuildPlanning | Intent::Specs | Intent::Maintenance => {
                Always
            }
            Intent::Vision | Intent::CarShopping | Intent::General => IfAvailable,
            Intent::Clarify => Never,
        },
        SlotKey::UserProfile => match intent {
            Intent::BuildPlanning | Intent::CarShopping | Intent::General => IfAvailable,
            Intent::Vision
            | Intent::PartsLookup
            | Intent::Specs
            | Intent::Maintenance
            | Intent::Clarify => Never,
        },
        SlotKey::Favorites => match intent {
            // Shopping fallback: favorites stand in for a garage the user
            // doesn't have yet.
            Intent::CarShopping => Conditional,
            Intent::Vision
            | Intent::PartsLookup
            | Intent::BuildPlanning
            | Intent::Specs
            | Intent::Maintenance
            | Intent::Clarify
            | Intent::General => Never,
        },
    }
}

/// Slot-specific secondary condition for `Conditional` dispositions.
fn secondary_condition(intent: Intent, slot: SlotKey, raw: &ContextBundle) -> bool {
    match (intent, slot) {
        (Intent::CarShopping, SlotKey::Favorites) => !raw.has(SlotKey::OwnedVehicles),
        _ => false,
    }
}

/// The context relevance filter.
pub struct ContextFilter {
    boosts: Vec<(SlotKey, Vec<Regex>)>,
}

impl ContextFilter {
    /// Create the filter with the production boost patterns.
    pub fn new() -> Self {
        let boost = |sources: &[&str]| -> Vec<Regex> {
            sources
                .iter()
                .map(|s| Regex::new(s).expect("boost regex is statically valid"))
                .collect()
        };

        Self {
            boosts: vec![
                (
                    SlotKey::OwnedVehicles,
                    boost(&[
                        r"(?i)\bmy\s+(car|truck|suv|ride|daily|garage|vehicle)\b",
                        r"(?i)\bi\s+(own|drive|have)\b",
                    ]),
                ),
                (
                    SlotKey::Location,
                    boost(&[r"(?i)\b(near\s+me|nearby|local(ly)?|in\s+my\s+area)\b"]),
                ),
                (
                    SlotKey::CurrentSubjectVehicle,
                    boost(&[r"(?i)\bthis\s+(car|one|truck|listing)\b"]),
                ),
                (
                    SlotKey::UserProfile,
                    boost(&[r"(?i)\b(i'?m\s+new\s+to|beginner|first\s+(car|build))\b"]),
                ),
                (
                    SlotKey::Favorites,
                    boost(&[r"(?i)\b(saved|favorites?|favourited?|shortlist|wish\s*list)\b"]),
                ),
            ],
        }
    }

    fn boost_matched(&self, slot: SlotKey, message: &str) -> bool {
        self.boosts
            .iter()
            .find(|(key, _)| *key == slot)
            .map(|(_, patterns)| patterns.iter().any(|p| p.is_match(message)))
            .unwrap_or(false)
    }

    /// Select the context slots to forward for this intent and message.
    ///
    /// The filtered bundle is always a key-subset of the raw bundle;
    /// lightweight always-included fields (page context, garage stats)
    /// bypass filtering entirely.
    pub fn filter(&self, intent: Intent, message: &str, raw: &ContextBundle) -> FilterOutcome {
        let mut context = FilteredContext::carrying(raw);
        let mut trace = FilterTrace::default();

        for slot in SlotKey::ALL {
            let present = raw.has(slot);
            let boosted = present && self.boost_matched(slot, message);

            let (included, reason) = match disposition(intent, slot) {
                Disposition::Always if present => (true, "always"),
                Disposition::Always => (false, "always_no_data"),
                Disposition::IfAvailable if present => (true, "if_available"),
                Disposition::IfAvailable => (false, "no_data"),
                Disposition::Never if boosted => (true, "boost"),
                Disposition::Never => (false, "never"),
                Disposition::Conditional if boosted => (true, "boost"),
                Disposition::Conditional
                    if present && secondary_condition(intent, slot, raw) =>
                {
                    (true, "secondary_condition")
                }
                Disposition::Conditional => (false, "condition_not_met"),
            };

            if included {
                context.include(raw, slot);
            }
            trace.decisions.push(SlotDecision {
                slot,
                included,
                reason,
            });
        }

        FilterOutcome { context, trace }
    }
}

impl Default for ContextFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::{GarageStats, LocationInfo, SlotPayload, VehicleRef};

    fn full_bundle() -> ContextBundle {
        let mut bundle = ContextBundle::new()
            .with(SlotPayload::OwnedVehicles {
                vehicles: vec![VehicleRef::new(2019, "Volkswagen", "GTI")],
            })
            .with(SlotPayload::Location {
                location: LocationInfo {
                    city: "Austin".to_string(),
                    region: "TX".to_string(),
                },
            })
            .with(SlotPayload::CurrentSubjectVehicle {
                vehicle: VehicleRef::new(2022, "Toyota", "GR86"),
            })
            .with(SlotPayload::UserProfile {
                profile: assistant_core::UserProfile {
                    display_name: Some("Sam".to_string()),
                    experience_level: Some("intermediate".to_string()),
                },
            })
            .with(SlotPayload::Favorites {
                vehicles: vec![VehicleRef::new(2021, "Honda", "Civic Type R")],
            });
        bundle.page_context = Some("vehicle/2022-toyota-gr86".to_string());
        bundle.garage_stats = Some(GarageStats {
            owned_count: 1,
            favorite_count: 1,
        });
        bundle
    }

    #[test]
    fn test_parts_lookup_includes_garage_not_location() {
        let filter = ContextFilter::new();
        let outcome = filter.filter(Intent::PartsLookup, "stage 1 options", &full_bundle());

        let keys = outcome.context.slot_keys();
        assert!(keys.contains(&SlotKey::OwnedVehicles));
        assert!(keys.contains(&SlotKey::CurrentSubjectVehicle));
        assert!(!keys.contains(&SlotKey::Location));
        assert!(!keys.contains(&SlotKey::Favorites));
    }

    #[test]
    fn test_filtered_is_always_subset() {
        let filter = ContextFilter::new();
        let bundle = full_bundle();
        for intent in Intent::ALL {
            let outcome = filter.filter(intent, "whatever message", &bundle);
            assert!(outcome.context.is_subset_of(&bundle));
        }
    }

    #[test]
    fn test_boost_overrides_never() {
        let filter = ContextFilter::new();
        // Specs never includes owned vehicles, but "my car" forces it.
        let outcome = filter.filter(Intent::Specs, "what's the 0-60 of my car", &full_bundle());
        assert!(outcome.context.get(SlotKey::OwnedVehicles).is_some());

        let decision = outcome
            .trace
            .decisions
            .iter()
            .find(|d| d.slot == SlotKey::OwnedVehicles)
            .unwrap();
        assert_eq!(decision.reason, "boost");
    }

    #[test]
    fn test_shopping_fallback_favorites_without_garage() {
        let filter = ContextFilter::new();

        // With owned vehicles the secondary condition fails.
        let outcome = filter.filter(Intent::CarShopping, "what should I buy", &full_bundle());
        assert!(outcome.context.get(SlotKey::Favorites).is_none());

        // Without owned vehicles favorites stand in.
        let mut bundle = full_bundle();
        bundle.set(SlotPayload::OwnedVehicles { vehicles: vec![] });
        let outcome = filter.filter(Intent::CarShopping, "what should I buy", &bundle);
        assert!(outcome.context.get(SlotKey::Favorites).is_some());
    }

    #[test]
    fn test_favorites_boost_wins_even_with_garage() {
        let filter = ContextFilter::new();
        let outcome = filter.filter(
            Intent::CarShopping,
            "compare the cars on my shortlist",
            &full_bundle(),
        );
        assert!(outcome.context.get(SlotKey::Favorites).is_some());
    }

    #[test]
    fn test_always_included_fields_bypass_filtering() {
        let filter = ContextFilter::new();
        // Clarify forwards no slots at all, but page context and stats ride along.
        let outcome = filter.filter(Intent::Clarify, "?", &full_bundle());
        assert!(outcome.context.slot_keys().is_empty());
        assert!(outcome.context.page_context.is_some());
        assert!(outcome.context.garage_stats.is_some());
    }

    #[test]
    fn test_trace_covers_every_slot() {
        let filter = ContextFilter::new();
        let outcome = filter.filter(Intent::General, "hello", &full_bundle());
        assert_eq!(outcome.trace.decisions.len(), SlotKey::ALL.len());
        assert!(!outcome.trace.summary().is_empty());
    }

    #[test]
    fn test_location_for_shopping() {
        let filter = ContextFilter::new();
        let outcome = filter.filter(Intent::CarShopping, "fun weekend car", &full_bundle());
        assert!(outcome.context.get(SlotKey::Location).is_some());
    }
}
