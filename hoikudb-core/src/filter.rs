//! Reduces a facility collection to the entries matching name and vacancy criteria.

use serde::{Deserialize, Serialize};

use crate::model::{AgeClass, Facility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAgeConstraint")]
/// Require at least `min_available` open places for one age class.
pub struct AgeConstraint {
    /// Age class the threshold applies to.
    pub age_class: AgeClass,
    min_available: u32,
}

// Deserialized thresholds go through the same clamp as `AgeConstraint::new`.
#[derive(Deserialize)]
struct RawAgeConstraint {
    age_class: AgeClass,
    min_available: u32,
}

impl From<RawAgeConstraint> for AgeConstraint {
    fn from(raw: RawAgeConstraint) -> Self {
        Self::new(raw.age_class, raw.min_available)
    }
}

impl AgeConstraint {
    /// Create a constraint; thresholds below one are raised to one.
    #[must_use]
    pub fn new(age_class: AgeClass, min_available: u32) -> Self {
        Self {
            age_class,
            min_available: min_available.max(1),
        }
    }

    /// Minimum available places, always at least one.
    #[must_use]
    pub fn min_available(&self) -> u32 {
        self.min_available
    }

    /// Change the threshold, keeping it at least one.
    pub fn set_min_available(&mut self, min_available: u32) {
        self.min_available = min_available.max(1);
    }

    /// Whether the facility has enough open places for this age class.
    #[must_use]
    pub fn admits(&self, facility: &Facility) -> bool {
        facility.stats.available(self.age_class) >= self.min_available
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Name and vacancy criteria applied to the facilities on the map.
pub struct FilterCriteria {
    /// Case-insensitive substring of the facility name; empty matches everything.
    pub name: String,
    /// Constraints that must all hold. Duplicates per age class are evaluated independently.
    pub constraints: Vec<AgeConstraint>,
}

impl FilterCriteria {
    /// Criteria that admit every facility.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style name filter.
    #[must_use]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style age constraint.
    #[must_use]
    pub fn with_constraint(mut self, age_class: AgeClass, min_available: u32) -> Self {
        self.constraints
            .push(AgeConstraint::new(age_class, min_available));
        self
    }

    /// First constraint on the given age class.
    #[must_use]
    pub fn constraint_for(&self, age_class: AgeClass) -> Option<&AgeConstraint> {
        self.constraints
            .iter()
            .find(|constraint| constraint.age_class == age_class)
    }

    /// Add a constraint for the age class, or drop every constraint on it if one exists.
    pub fn toggle(&mut self, age_class: AgeClass) {
        if self.constraint_for(age_class).is_some() {
            self.constraints
                .retain(|constraint| constraint.age_class != age_class);
        } else {
            self.constraints.push(AgeConstraint::new(age_class, 1));
        }
    }

    /// Shift the threshold of every constraint on the age class by `delta`, floored at one.
    pub fn adjust(&mut self, age_class: AgeClass, delta: i64) {
        for constraint in self
            .constraints
            .iter_mut()
            .filter(|constraint| constraint.age_class == age_class)
        {
            let shifted = i64::from(constraint.min_available()).saturating_add(delta);
            constraint.set_min_available(u32::try_from(shifted).unwrap_or(1));
        }
    }

    /// Drop the name and every constraint.
    pub fn clear(&mut self) {
        self.name.clear();
        self.constraints.clear();
    }

    /// True when neither a name nor any constraint is set.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.name.is_empty() && self.constraints.is_empty()
    }

    /// Whether a single facility passes every criterion.
    #[must_use]
    pub fn matches(&self, facility: &Facility) -> bool {
        name_matches(&self.name, &facility.name)
            && self
                .constraints
                .iter()
                .all(|constraint| constraint.admits(facility))
    }
}

/// Keep the facilities matching `criteria`, preserving their order.
#[must_use]
pub fn apply(facilities: &[Facility], criteria: &FilterCriteria) -> Vec<Facility> {
    facilities
        .iter()
        .filter(|facility| criteria.matches(facility))
        .cloned()
        .collect()
}

fn name_matches(query: &str, name: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}
