//! Cost accounting for edit jobs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Cost in billing credits.
///
/// Costs combine as a monoid (zero + saturating add), so the same
/// accumulator works for both the success path and partial-cost
/// reporting on failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct Cost(pub u32);

impl Cost {
    /// Zero cost (monoid identity).
    pub const ZERO: Cost = Cost(0);

    /// Credits charged per prompt mutation call.
    pub const PROMPT_MUTATION: Cost = Cost(1);

    /// Credits charged per scene generation call.
    pub const SCENE_GENERATION: Cost = Cost(20);

    /// Credits charged per storage replace/render round.
    pub const STORAGE: Cost = Cost(1);

    /// Credits in this cost.
    pub fn credits(&self) -> u32 {
        self.0
    }

    /// Estimated total cost of one edit job, assuming no retries.
    pub fn estimate_edit() -> Cost {
        Cost::PROMPT_MUTATION + Cost::SCENE_GENERATION + Cost::STORAGE
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credits", self.0)
    }
}
