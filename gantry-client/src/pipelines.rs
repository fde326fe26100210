//! Pipeline-related API endpoints

use crate::GantryClient;
use crate::error::Result;
use gantry_core::domain::notification::NotificationEvent;
use gantry_core::domain::report::PipelineReport;
use gantry_core::dto::notification::NotificationQuery;
use gantry_core::dto::pipeline::{CancelResponse, RunPipeline};

impl GantryClient {
    /// Run the pipeline and wait for its report
    ///
    /// `models` restricts the run to a subset of the catalogue; `None` runs
    /// every model.
    pub async fn run_pipeline(&self, models: Option<Vec<String>>) -> Result<PipelineReport> {
        let response = self
            .client
            .post(self.url("/pipeline/run"))
            .json(&RunPipeline { models })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Cancel every active pipeline run
    pub async fn cancel_pipeline(&self) -> Result<CancelResponse> {
        let response = self.client.post(self.url("/pipeline/cancel")).send().await?;

        self.handle_response(response).await
    }

    /// Query the notification log
    pub async fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationEvent>> {
        let response = self
            .client
            .get(self.url("/pipeline/notifications"))
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
