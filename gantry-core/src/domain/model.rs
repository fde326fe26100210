//! Model catalogue domain types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Hyperparameters handed verbatim to a training job
pub type Hyperparams = BTreeMap<String, serde_json::Value>;

/// Training strategy family of a model.
///
/// Declaration order is the fixed execution order of a pipeline run: later
/// categories may consume promoted artifacts of earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Basic,
    Ensemble,
    XGBoost,
    MultiCurrency,
    Multitask,
    Segmentation,
    Distilled,
}

impl Category {
    /// All categories in execution order
    pub const ORDER: [Category; 7] = [
        Category::Basic,
        Category::Ensemble,
        Category::XGBoost,
        Category::MultiCurrency,
        Category::Multitask,
        Category::Segmentation,
        Category::Distilled,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Basic => "Basic",
            Category::Ensemble => "Ensemble",
            Category::XGBoost => "XGBoost",
            Category::MultiCurrency => "MultiCurrency",
            Category::Multitask => "Multitask",
            Category::Segmentation => "Segmentation",
            Category::Distilled => "Distilled",
        };
        write!(f, "{}", name)
    }
}

/// Which way a model's evaluation score improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreDirection {
    HigherIsBetter,
    LowerIsBetter,
}

/// How the external training job for a model is launched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryPoint {
    /// Run an external program
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

/// One entry of the static model catalogue
///
/// Loaded once at startup and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub name: String,
    pub category: Category,
    pub score_direction: ScoreDirection,
    pub entry_point: EntryPoint,
    #[serde(default)]
    pub hyperparams: Hyperparams,
    /// Overrides the server-wide job timeout
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}
