//! Subscription plans

use super::segment;
use crate::error::ClientResult;
use crate::options::HttpMethod;
use crate::service::ApiService;
use naturalize_core::types::NewSubscriptionPlan;
use naturalize_core::{ApiResponse, ResourceId};

impl ApiService {
    /// A page of plans; served from the cache while fresh
    pub async fn list_plans(&self, skip: usize, limit: usize) -> ApiResponse {
        let options = self
            .options()
            .param("skip", skip)
            .param("limit", limit)
            .cached();
        self.retrying(HttpMethod::Get, "/subscription_plans/", None, options)
            .await
    }

    /// One plan
    pub async fn get_plan(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/subscription_plans/{}", segment(id));
        self.get(&path, self.options()).await
    }

    /// Create a plan
    ///
    /// # Errors
    ///
    /// Returns a validation error when the plan has no title or an invalid
    /// price; nothing is sent in that case.
    pub async fn create_plan(&self, plan: NewSubscriptionPlan) -> ClientResult<ApiResponse> {
        let body = serde_json::to_value(plan.normalized()?)?;
        Ok(self
            .post("/subscription_plans/", Some(body), self.options())
            .await)
    }

    /// Replace a plan's fields
    ///
    /// # Errors
    ///
    /// Same validation as [`ApiService::create_plan`].
    pub async fn update_plan(&self, id: &ResourceId, plan: NewSubscriptionPlan) -> ClientResult<ApiResponse> {
        let path = format!("/subscription_plans/{}", segment(id));
        let body = serde_json::to_value(plan.normalized()?)?;
        Ok(self.patch(&path, Some(body), self.options()).await)
    }

    /// Delete a plan
    pub async fn delete_plan(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/subscription_plans/{}", segment(id));
        self.delete(&path, self.options()).await
    }
}
