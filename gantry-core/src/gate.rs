//! Quality gate
//!
//! Decides whether a freshly trained candidate replaces the version in
//! service. Pure and deterministic; it never touches storage.

use serde::{Deserialize, Serialize};

use crate::domain::model::{ModelDefinition, ScoreDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Promote,
    Reject,
}

/// Compare a candidate score against the currently promoted one.
///
/// With no previous version the candidate is always promoted. Otherwise the
/// candidate must be strictly better in the model's score direction; ties
/// keep the existing version.
pub fn decide(definition: &ModelDefinition, candidate: f64, previous: Option<f64>) -> Decision {
    let Some(previous) = previous else {
        return Decision::Promote;
    };

    let improved = match definition.score_direction {
        ScoreDirection::HigherIsBetter => candidate > previous,
        ScoreDirection::LowerIsBetter => candidate < previous,
    };

    if improved {
        Decision::Promote
    } else {
        Decision::Reject
    }
}
