//! Model-related API endpoints

use crate::GantryClient;
use crate::error::Result;
use gantry_core::domain::artifact::ArtifactVersion;
use gantry_core::domain::run::TrainingRun;
use gantry_core::dto::model::{ModelSummary, VersionSummary};

impl GantryClient {
    /// List catalogue models with their promoted versions
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let response = self.client.get(self.url("/models")).send().await?;

        self.handle_response(response).await
    }

    /// Version history of a model, oldest first
    pub async fn list_versions(&self, model: &str) -> Result<Vec<VersionSummary>> {
        let url = self.url(&format!("/models/{}/versions", model));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Training runs of a model, oldest first
    pub async fn list_runs(&self, model: &str) -> Result<Vec<TrainingRun>> {
        let url = self.url(&format!("/models/{}/runs", model));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Reverse the most recent cutover of a model
    ///
    /// Fails with a 409 `ApiError` when there is no previous version.
    pub async fn rollback(&self, model: &str) -> Result<ArtifactVersion> {
        let url = self.url(&format!("/models/{}/rollback", model));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Blob of the promoted version of a model
    pub async fn download_artifact(&self, model: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("/models/{}/artifact", model));
        let response = self.client.get(&url).send().await?;

        self.handle_bytes(response).await
    }
}
