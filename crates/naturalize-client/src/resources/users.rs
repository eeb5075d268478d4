//! User administration and the signed-in admin's profile

use super::segment;
use crate::options::HttpMethod;
use crate::service::ApiService;
use crate::transfer::Upload;
use naturalize_core::types::{AccountStatus, ProfileUpdate};
use naturalize_core::{ApiResponse, ResourceId};
use serde_json::to_value;

/// Multipart field of a profile image upload
pub const PROFILE_IMAGE_FIELD: &str = "profile_image";

impl ApiService {
    /// Every platform user
    pub async fn list_users(&self) -> ApiResponse {
        self.retrying(HttpMethod::Get, "/dashboard/user/all", None, self.options())
            .await
    }

    /// Users with the given account status
    pub async fn list_users_by_status(&self, status: AccountStatus) -> ApiResponse {
        let path = format!("/dashboard/user/all/filter/{}", segment(status.as_str()));
        self.retrying(HttpMethod::Get, &path, None, self.options())
            .await
    }

    /// Public record of one user
    pub async fn get_user(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/users/{}", segment(id));
        self.get(&path, self.options()).await
    }

    /// Dashboard view of one user
    pub async fn user_detail(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/dashboard/users/{}", segment(id));
        self.get(&path, self.options()).await
    }

    /// Time a user spent learning
    pub async fn user_time(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/time/user/{}", segment(id));
        self.get(&path, self.options()).await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/users/{}", segment(id));
        self.delete(&path, self.options()).await
    }

    /// Activate, deactivate or suspend an account
    pub async fn change_user_status(&self, id: &ResourceId, status: AccountStatus) -> ApiResponse {
        let path = format!("/dashboard/user/status/change/{}", segment(id));
        let options = self.options().param("acc_status", status.as_str());
        self.patch(&path, None, options).await
    }

    /// The signed-in admin
    pub async fn profile(&self) -> ApiResponse {
        self.get("/users/info/me", self.options()).await
    }

    /// Update the signed-in admin's details
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResponse {
        match to_value(update) {
            Ok(body) => {
                self.patch("/users/update/info", Some(body), self.options())
                    .await
            }
            Err(e) => ApiResponse::failure(e.to_string(), None),
        }
    }

    /// Replace the signed-in admin's profile image
    ///
    /// The file is always sent under the `profile_image` field.
    pub async fn update_profile_image(&self, mut image: Upload) -> ApiResponse {
        PROFILE_IMAGE_FIELD.clone_into(&mut image.field);
        self.upload_file("/users/update_profile_image", image, self.options())
            .await
    }

    /// Remove the signed-in admin's profile image
    pub async fn delete_profile_photo(&self) -> ApiResponse {
        self.delete("/users/profile/photo", self.options()).await
    }
}
