//! Pipeline report
//!
//! Built fresh by the pipeline controller for every run and never persisted;
//! the durable record is the version journal and the notification log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::dataset::DatasetHandle;
use crate::domain::model::Category;
use crate::domain::notification::NotificationEvent;
use crate::domain::run::ModelState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub dataset: DatasetHandle,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_models: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub by_category: BTreeMap<Category, CategoryCounts>,
    pub notifications: Vec<NotificationEvent>,
}

impl PipelineReport {
    /// Aggregates terminal model states into per-category counts
    pub fn build(
        run_id: Uuid,
        dataset: DatasetHandle,
        started_at: DateTime<Utc>,
        outcomes: impl IntoIterator<Item = (Category, ModelState)>,
        notifications: Vec<NotificationEvent>,
    ) -> Self {
        let mut by_category: BTreeMap<Category, CategoryCounts> = BTreeMap::new();
        let mut succeeded = 0;
        let mut failed = 0;

        for (category, state) in outcomes {
            let counts = by_category.entry(category).or_default();
            if state.is_success() {
                counts.success += 1;
                succeeded += 1;
            } else {
                counts.failed += 1;
                failed += 1;
            }
        }

        Self {
            run_id,
            dataset,
            started_at,
            finished_at: Utc::now(),
            total_models: succeeded + failed,
            succeeded,
            failed,
            by_category,
            notifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> DatasetHandle {
        DatasetHandle {
            id: Uuid::new_v4(),
            location: "data.csv".to_string(),
            fingerprint: "abc".to_string(),
            size_bytes: 3,
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_counts() {
        let report = PipelineReport::build(
            Uuid::new_v4(),
            dataset(),
            Utc::now(),
            vec![
                (Category::Basic, ModelState::Promoted),
                (Category::Basic, ModelState::RolledBack),
                (Category::Basic, ModelState::Failed),
                (Category::Distilled, ModelState::TimedOut),
            ],
            vec![],
        );

        assert_eq!(report.total_models, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(
            report.by_category[&Category::Basic],
            CategoryCounts {
                success: 2,
                failed: 1
            }
        );
        assert_eq!(
            report.by_category[&Category::Distilled],
            CategoryCounts {
                success: 0,
                failed: 1
            }
        );
        assert!(!report.by_category.contains_key(&Category::Ensemble));
    }

    #[test]
    fn test_report_json_shape() {
        let report = PipelineReport::build(
            Uuid::new_v4(),
            dataset(),
            Utc::now(),
            vec![(Category::XGBoost, ModelState::Promoted)],
            vec![],
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalModels"], 1);
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["byCategory"]["XGBoost"]["success"], 1);
        assert!(json["notifications"].as_array().unwrap().is_empty());
    }
}
