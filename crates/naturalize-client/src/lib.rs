//! HTTP access layer for the Naturalize learning platform API
//!
//! [`ApiService`] gives every backend call the same shape: it always resolves
//! to an [`ApiResponse`] envelope. Bearer tokens come from a
//! [`CredentialProvider`], user-facing messages go to a [`Notifier`], and a 401
//! reaches the [`SessionHandler`]. GETs can opt into a read-through cache that
//! any successful mutation clears; calls can be retried, batched and
//! cancelled by name.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening
)]

pub mod batch;
pub mod cache;
pub mod cancel;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod options;
pub mod policy;
pub mod resources;
pub mod retry;
pub mod service;
pub mod session;
pub mod transfer;

pub use batch::{BatchOutcome, BatchRequest};
pub use cancel::RequestToken;
pub use credentials::{CredentialProvider, FileCredentials, StaticCredentials};
pub use error::{ClientError, ClientResult};
pub use naturalize_core::{ApiResponse, ResourceId};
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, SilentNotifier, TracingNotifier};
pub use options::{HttpMethod, RequestOptions};
pub use resources::ResponseExt;
pub use service::{ApiService, ApiServiceBuilder};
pub use session::{LoginRedirect, NoopSessionHandler, SessionHandler};
pub use transfer::{ProgressCallback, Upload};
