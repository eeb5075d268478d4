//! Typed endpoint wrappers
//!
//! Each submodule adds the calls for one area of the dashboard to
//! [`ApiService`](crate::ApiService). They all return envelopes; use
//! [`ResponseExt::decode`] to turn one into a DTO.

mod courses;
mod dashboard;
mod lessons;
mod plans;
mod questions;
mod users;

pub use courses::COURSE_IMAGE_FIELD;
pub use dashboard::DISTRIBUTION_TIMEOUT;
pub use lessons::LESSON_IMAGE_FIELD;
pub use users::PROFILE_IMAGE_FIELD;

use crate::error::{ClientError, ClientResult};
use naturalize_core::ApiResponse;
use serde::de::DeserializeOwned;
use std::fmt::Display;

/// Typed access to an envelope's payload
pub trait ResponseExt {
    /// Decode the payload of a successful envelope
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for a failure envelope and
    /// [`ClientError::Core`] when the payload is missing or has another shape.
    fn decode<T: DeserializeOwned>(&self) -> ClientResult<T>;
}

impl ResponseExt for ApiResponse {
    fn decode<T: DeserializeOwned>(&self) -> ClientResult<T> {
        if !self.success {
            return Err(ClientError::api(self));
        }
        Ok(self.data_as()?)
    }
}

/// Percent-encode a caller-supplied path segment
pub(crate) fn segment(value: impl Display) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}
