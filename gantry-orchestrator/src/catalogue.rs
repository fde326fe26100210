//! Model catalogue
//!
//! The set of models a pipeline run trains. Built once at startup from a
//! JSON file and never mutated afterwards; every definition is resolved to
//! a `TrainingJob` up front.

use gantry_core::domain::model::ModelDefinition;
use gantry_runner::{CommandJob, TrainingJob};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalogue JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalogue contains no models")]
    Empty,

    #[error("model '{0}' is defined more than once")]
    DuplicateModel(String),

    #[error("invalid model name '{0}': use letters, digits, '_', '-' or '.'")]
    InvalidName(String),

    #[error("unknown models: {}", .0.join(", "))]
    UnknownModels(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    models: Vec<ModelDefinition>,
}

/// A model definition together with the job that trains it
#[derive(Clone)]
pub struct CatalogueEntry {
    pub definition: ModelDefinition,
    pub job: Arc<dyn TrainingJob>,
}

impl CatalogueEntry {
    pub fn new(definition: ModelDefinition, job: Arc<dyn TrainingJob>) -> Self {
        Self { definition, job }
    }
}

#[derive(Clone)]
pub struct ModelCatalogue {
    entries: Vec<CatalogueEntry>,
}

impl ModelCatalogue {
    pub fn new(entries: Vec<CatalogueEntry>) -> Result<Self, CatalogueError> {
        if entries.is_empty() {
            return Err(CatalogueError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            let name = &entry.definition.name;
            if !is_valid_name(name) {
                return Err(CatalogueError::InvalidName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(CatalogueError::DuplicateModel(name.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// Builds a catalogue whose entry points run as external commands
    /// with scratch space under `work_dir`
    pub fn from_definitions(
        definitions: Vec<ModelDefinition>,
        work_dir: &Path,
    ) -> Result<Self, CatalogueError> {
        let entries = definitions
            .into_iter()
            .map(|definition| {
                let job: Arc<dyn TrainingJob> =
                    Arc::new(CommandJob::from_definition(&definition, work_dir));
                CatalogueEntry::new(definition, job)
            })
            .collect();

        Self::new(entries)
    }

    pub fn from_json(json: &str, work_dir: &Path) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = serde_json::from_str(json)?;
        Self::from_definitions(file.models, work_dir)
    }

    pub fn from_file(path: &Path, work_dir: &Path) -> Result<Self, CatalogueError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json, work_dir)
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&CatalogueEntry> {
        self.entries.iter().find(|e| e.definition.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries a run should train: `None` selects the whole catalogue,
    /// otherwise every named model must exist.
    pub fn select(&self, subset: Option<&[String]>) -> Result<Vec<CatalogueEntry>, CatalogueError> {
        let Some(names) = subset else {
            return Ok(self.entries.clone());
        };

        let unknown: Vec<String> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(CatalogueError::UnknownModels(unknown));
        }

        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self
            .entries
            .iter()
            .filter(|e| wanted.contains(e.definition.name.as_str()))
            .cloned()
            .collect())
    }
}

// Names double as blob directory names.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::model::Category;

    const CATALOGUE: &str = r#"{
        "models": [
            {
                "name": "brand_classifier",
                "category": "Basic",
                "scoreDirection": "HigherIsBetter",
                "entryPoint": {"command": {"program": "python3", "args": ["train_brand.py"]}}
            },
            {
                "name": "price_regressor",
                "category": "XGBoost",
                "scoreDirection": "LowerIsBetter",
                "entryPoint": {"command": {"program": "python3", "args": ["train_price.py"]}},
                "hyperparams": {"max_depth": 8},
                "timeoutSeconds": 600
            }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let catalogue = ModelCatalogue::from_json(CATALOGUE, Path::new("/tmp/work")).unwrap();
        assert_eq!(catalogue.len(), 2);

        let price = catalogue.get("price_regressor").unwrap();
        assert_eq!(price.definition.category, Category::XGBoost);
        assert_eq!(price.definition.timeout_seconds, Some(600));
        assert!(catalogue.get("missing").is_none());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ModelCatalogue::from_json(r#"{"models": []}"#, Path::new("w")),
            Err(CatalogueError::Empty)
        ));

        let dup = r#"{"models": [
            {"name": "a", "category": "Basic", "scoreDirection": "HigherIsBetter",
             "entryPoint": {"command": {"program": "true"}}},
            {"name": "a", "category": "Ensemble", "scoreDirection": "HigherIsBetter",
             "entryPoint": {"command": {"program": "true"}}}
        ]}"#;
        assert!(matches!(
            ModelCatalogue::from_json(dup, Path::new("w")),
            Err(CatalogueError::DuplicateModel(name)) if name == "a"
        ));

        let bad_name = r#"{"models": [
            {"name": "../escape", "category": "Basic", "scoreDirection": "HigherIsBetter",
             "entryPoint": {"command": {"program": "true"}}}
        ]}"#;
        assert!(matches!(
            ModelCatalogue::from_json(bad_name, Path::new("w")),
            Err(CatalogueError::InvalidName(_))
        ));

        assert!(matches!(
            ModelCatalogue::from_json("not json", Path::new("w")),
            Err(CatalogueError::Parse(_))
        ));
    }

    #[test]
    fn test_select() {
        let catalogue = ModelCatalogue::from_json(CATALOGUE, Path::new("w")).unwrap();

        assert_eq!(catalogue.select(None).unwrap().len(), 2);

        let subset = vec!["price_regressor".to_string()];
        let selected = catalogue.select(Some(subset.as_slice())).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].definition.name, "price_regressor");

        let unknown = vec!["brand_classifier".to_string(), "nope".to_string()];
        match catalogue.select(Some(unknown.as_slice())) {
            Err(CatalogueError::UnknownModels(names)) => assert_eq!(names, vec!["nope"]),
            _ => panic!("expected UnknownModels"),
        }
    }
}
