//! Lessons of a course

use super::segment;
use crate::error::ClientResult;
use crate::options::HttpMethod;
use crate::service::ApiService;
use crate::transfer::Upload;
use naturalize_core::types::{LessonUpdate, NewLesson};
use naturalize_core::{ApiResponse, Error, ResourceId};

/// Multipart field of a lesson image
pub const LESSON_IMAGE_FIELD: &str = "image_url";

impl ApiService {
    /// Lessons of one course
    pub async fn lessons_by_course(&self, course_id: &ResourceId) -> ApiResponse {
        let path = format!("/dashboard/lesson/by_course_id/{}", segment(course_id));
        self.retrying(HttpMethod::Get, &path, None, self.options())
            .await
    }

    /// One lesson
    pub async fn get_lesson(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/lessons/{}", segment(id));
        self.get(&path, self.options()).await
    }

    /// Create a lesson with its image
    ///
    /// # Errors
    ///
    /// Returns a validation error when the title is blank; nothing is sent in
    /// that case.
    pub async fn create_lesson(&self, lesson: &NewLesson, mut image: Upload) -> ClientResult<ApiResponse> {
        let title = lesson.title.trim();
        if title.is_empty() {
            return Err(Error::validation("name", "Please provide a lesson name").into());
        }

        let fields = vec![
            ("name".to_string(), title.to_string()),
            (
                "description".to_string(),
                lesson.description.clone().unwrap_or_default(),
            ),
            ("course_id".to_string(), lesson.course_id.to_string()),
        ];
        LESSON_IMAGE_FIELD.clone_into(&mut image.field);
        Ok(self
            .send_form(
                HttpMethod::Post,
                "/dashboard/create/lesson",
                fields,
                Some(image),
                self.options(),
            )
            .await)
    }

    /// Change some fields of a lesson
    pub async fn update_lesson(&self, id: &ResourceId, update: &LessonUpdate) -> ClientResult<ApiResponse> {
        let path = format!("/lessons/{}", segment(id));
        let body = serde_json::to_value(update)?;
        Ok(self.patch(&path, Some(body), self.options()).await)
    }

    /// Delete a lesson
    pub async fn delete_lesson(&self, id: &ResourceId) -> ApiResponse {
        let path = format!("/lessons/{}", segment(id));
        self.delete(&path, self.options()).await
    }
}
