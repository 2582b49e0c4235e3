// User search preferences and the partial updates the assistant sends.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::listing::de_opt_whole_number;

// ---------------------------------------------------------------------------
// Feature catalog
// ---------------------------------------------------------------------------

/// A toggleable apartment feature. The set is fixed; declaration order is
/// the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Balcony,
    Parking,
    Elevator,
    Furnished,
    Pets,
    Garden,
    Storage,
    Laundry,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Balcony,
        Feature::Parking,
        Feature::Elevator,
        Feature::Furnished,
        Feature::Pets,
        Feature::Garden,
        Feature::Storage,
        Feature::Laundry,
    ];

    /// Wire identifier, as used in `features` maps.
    pub fn id(self) -> &'static str {
        match self {
            Feature::Balcony => "balcony",
            Feature::Parking => "parking",
            Feature::Elevator => "elevator",
            Feature::Furnished => "furnished",
            Feature::Pets => "pets",
            Feature::Garden => "garden",
            Feature::Storage => "storage",
            Feature::Laundry => "laundry",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::Balcony => "Balcony",
            Feature::Parking => "Parking",
            Feature::Elevator => "Elevator",
            Feature::Furnished => "Furnished",
            Feature::Pets => "Pet Friendly",
            Feature::Garden => "Garden",
            Feature::Storage => "Storage Room",
            Feature::Laundry => "Laundry Room",
        }
    }

    pub fn from_id(id: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.id() == id)
    }
}

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// A numeric range where either bound may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Overwrite the bounds present in `update`, keeping the others.
    fn merge(&mut self, update: &Range) {
        if let Some(min) = update.min {
            self.min = Some(min);
        }
        if let Some(max) = update.max {
            self.max = Some(max);
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// The user's accumulated search preferences.
///
/// Mutated only through [`Preferences::apply`], which merges partial updates
/// so that fields the update does not mention keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub budget: Option<Range>,
    #[serde(default)]
    pub size: Option<Range>,
    #[serde(default)]
    pub rooms: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    enabled: BTreeSet<Feature>,
}

/// A partial preferences payload from the `update_preferences` tool.
///
/// Only fields the user actually mentioned are present. `features` is keyed
/// by wire id so that ids outside the catalog survive decoding and can be
/// reported instead of failing the whole update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Range>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_whole_number"
    )]
    pub rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
}

/// What [`Preferences::apply`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    /// Whether any stored value differs from before the update.
    pub changed: bool,
    /// Feature ids in the update that are not part of the catalog.
    pub unknown_features: Vec<String>,
}

impl Preferences {
    /// Merge a partial update into the stored preferences.
    pub fn apply(&mut self, update: &PreferencesUpdate) -> ApplyOutcome {
        let before = self.clone();

        if let Some(budget) = &update.budget {
            self.budget.get_or_insert_with(Range::default).merge(budget);
        }
        if let Some(size) = &update.size {
            self.size.get_or_insert_with(Range::default).merge(size);
        }
        if let Some(rooms) = update.rooms {
            self.rooms = Some(rooms);
        }
        if let Some(location) = &update.location {
            self.location = Some(location.clone());
        }

        let mut unknown_features = Vec::new();
        for (id, wanted) in &update.features {
            match Feature::from_id(id) {
                Some(feature) => self.set_feature(feature, *wanted),
                None => {
                    warn!(feature = %id, "Ignoring unknown preference feature");
                    unknown_features.push(id.clone());
                }
            }
        }

        ApplyOutcome {
            changed: *self != before,
            unknown_features,
        }
    }

    pub fn set_feature(&mut self, feature: Feature, enabled: bool) {
        if enabled {
            self.enabled.insert(feature);
        } else {
            self.enabled.remove(&feature);
        }
    }

    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    /// Enabled features in catalog order.
    pub fn enabled_features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.enabled.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.budget.is_none()
            && self.size.is_none()
            && self.rooms.is_none()
            && self.location.is_none()
            && self.enabled.is_empty()
    }
}
