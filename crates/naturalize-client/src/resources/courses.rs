//! Courses (called themes in the dashboard)

use super::segment;
use crate::error::ClientResult;
use crate::options::HttpMethod;
use crate::service::ApiService;
use crate::transfer::Upload;
use naturalize_core::types::NewCourse;
use naturalize_core::{ApiResponse, Error, ResourceId};

/// Multipart field of a course cover image
pub const COURSE_IMAGE_FIELD: &str = "course_image";

impl ApiService {
    /// Every course; served from the cache while fresh
    pub async fn list_courses(&self) -> ApiResponse {
        let options = self.options().param("skip", 0).param("limit", 0).cached();
        self.retrying(HttpMethod::Get, "/dashboard/filter/course", None, options)
            .await
    }

    /// Create a course with its cover image
    ///
    /// # Errors
    ///
    /// Returns a validation error when the course name is blank; nothing is
    /// sent in that case.
    pub async fn create_course(&self, course: &NewCourse, mut image: Upload) -> ClientResult<ApiResponse> {
        let name = course.name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "Please provide a theme name").into());
        }

        let fields = vec![
            ("name".to_string(), name.to_string()),
            (
                "description".to_string(),
                course.description.clone().unwrap_or_default(),
            ),
        ];
        COURSE_IMAGE_FIELD.clone_into(&mut image.field);
        Ok(self
            .send_form(
                HttpMethod::Post,
                "/dashboard/create/course",
                fields,
                Some(image),
                self.options(),
            )
            .await)
    }

    /// Delete a course
    pub async fn delete_course(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/courses/{}", segment(id));
        self.delete(&path, self.options()).await
    }
}
