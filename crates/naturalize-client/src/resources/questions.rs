//! Quiz questions

use super::segment;
use crate::error::ClientResult;
use crate::options::HttpMethod;
use crate::service::ApiService;
use naturalize_core::types::NewQuestion;
use naturalize_core::{ApiResponse, ResourceId};

impl ApiService {
    /// Question statistics for the dashboard
    pub async fn question_stats(&self) -> ApiResponse {
        self.retrying(
            HttpMethod::Get,
            "/dashboard/statistics/questions/",
            None,
            self.options(),
        )
        .await
    }

    /// Create a question after normalizing it
    ///
    /// # Errors
    ///
    /// Returns a validation error when the question is incomplete; nothing is
    /// sent in that case.
    pub async fn create_question(&self, question: NewQuestion) -> ClientResult<ApiResponse> {
        let body = serde_json::to_value(question.normalized()?)?;
        Ok(self.post("/questions/", Some(body), self.options()).await)
    }

    /// Delete a question
    pub async fn delete_question(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/questions/{}", segment(id));
        self.delete(&path, self.options()).await
    }
}
