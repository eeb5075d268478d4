//! Dashboard statistics widgets

use crate::options::HttpMethod;
use crate::service::ApiService;
use naturalize_core::ApiResponse;
use std::time::Duration;

/// Deadline of the subscription distribution widget
pub const DISTRIBUTION_TIMEOUT: Duration = Duration::from_secs(10);

impl ApiService {
    /// Active users per day over the last `days` days
    pub async fn user_activity(&self, days: u32) -> ApiResponse {
        let options = self.options().param("days", days);
        self.retrying(
            HttpMethod::Get,
            "/dashboard/statistics/users/activity",
            None,
            options,
        )
        .await
    }

    /// Monthly user growth
    pub async fn user_growth(&self) -> ApiResponse {
        self.retrying(
            HttpMethod::Get,
            "/dashboard/analytics/user-growth",
            None,
            self.options(),
        )
        .await
    }

    /// Share of users per plan
    ///
    /// Runs as a background request with a ten second deadline: a 401 here
    /// clears credentials without redirecting.
    pub async fn subscription_distribution(&self) -> ApiResponse {
        let options = self
            .options()
            .timeout(DISTRIBUTION_TIMEOUT)
            .background();
        self.get("/dashboard/statistics/subscription-distribution", options)
            .await
    }

    /// Completion statistics for every course
    pub async fn all_courses_stats(&self) -> ApiResponse {
        self.retrying(
            HttpMethod::Get,
            "/dashboard/all-courses-stats",
            None,
            self.options(),
        )
        .await
    }

    /// Payment total of the last 30 days
    pub async fn payments_last_30_days(&self) -> ApiResponse {
        self.get("/paymentss/payments/total-last-30days", self.options())
            .await
    }
}
