//! Envelope and backend data types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Message used when a successful body carries no message of its own
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Success";

/// Current time as an RFC 3339 UTC string
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Uniform wrapper returned by every API call, whatever the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the call succeeded
    #[serde(default)]
    pub success: bool,

    /// Payload of a successful call
    #[serde(default)]
    pub data: Option<Value>,

    /// Human-readable outcome
    #[serde(default)]
    pub message: String,

    /// Field-level errors reported by the server
    #[serde(default)]
    pub errors: Option<Value>,

    /// When the envelope was produced
    #[serde(default = "now_timestamp")]
    pub timestamp: String,

    /// How the envelope was produced; never part of the wire shape
    #[serde(skip)]
    pub meta: ResponseMeta,
}

/// Transport facts about an envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    /// No response arrived (offline, DNS, timeout)
    pub network_error: bool,
    /// The caller cancelled the request before it resolved
    pub cancelled: bool,
}

impl ApiResponse {
    /// Create a success envelope
    #[must_use]
    pub fn ok(data: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            errors: None,
            timestamp: now_timestamp(),
            meta: ResponseMeta::default(),
        }
    }

    /// Create a failure envelope
    #[must_use]
    pub fn failure(message: impl Into<String>, errors: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            errors,
            timestamp: now_timestamp(),
            meta: ResponseMeta::default(),
        }
    }

    /// Wrap a bare server body that did not bring its own envelope
    ///
    /// The message is taken from a string `message` field of the body, if any.
    #[must_use]
    pub fn wrap(body: Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_SUCCESS_MESSAGE)
            .to_string();
        let data = if body.is_null() { None } else { Some(body) };
        Self::ok(data, message)
    }

    /// Attach the HTTP status the envelope was built from
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.meta.status = Some(status);
        self
    }

    /// Whether the call succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Whether the request was cancelled; such results must be discarded
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.meta.cancelled
    }

    /// HTTP status the envelope was built from, if a response arrived
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.meta.status
    }

    /// Decode the payload into a typed value
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingData`] when the envelope has no payload and
    /// [`crate::Error::Serialization`] when the payload has a different shape.
    pub fn data_as<T: DeserializeOwned>(&self) -> crate::Result<T> {
        let data = self.data.as_ref().ok_or_else(|| crate::Error::MissingData {
            context: self.message.clone(),
        })?;
        Ok(T::deserialize(data)?)
    }
}

/// Identifier that the backend sends either as a number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// Numeric id
    Number(i64),
    /// String id (UUIDs and the like)
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl FromStr for ResourceId {
    type Err = std::convert::Infallible;

    /// Integers become numeric ids, anything else stays text
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Number))
    }
}

/// Account status of a platform user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account in good standing
    #[default]
    Active,
    /// Account switched off by its owner or an admin
    Inactive,
    /// Account blocked by an admin
    Suspended,
}

impl AccountStatus {
    /// Wire token used by the status endpoints
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspend" | "suspended" => Ok(Self::Suspended),
            other => Err(crate::Error::validation(
                "account_status",
                format!("unknown account status '{other}'"),
            )),
        }
    }
}

/// Subscription tier attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// No paid plan
    #[default]
    Free,
    /// Entry paid plan
    Basic,
    /// Full paid plan
    Premium,
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
        })
    }
}

impl FromStr for PlanTier {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            other => Err(crate::Error::validation(
                "plan",
                format!("unknown plan '{other}'"),
            )),
        }
    }
}

/// Role of a platform account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Learner
    #[default]
    User,
    /// Dashboard administrator
    Admin,
}

/// Platform user as returned by the user endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Email address
    pub email: String,
    /// Subscription tier
    #[serde(default)]
    pub plan: PlanTier,
    /// Phone number
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Whether the email was verified
    #[serde(default)]
    pub is_verified: bool,
    /// Account status
    #[serde(default)]
    pub account_status: AccountStatus,
    /// Account role
    #[serde(default)]
    pub role: UserRole,
    /// Avatar URL
    #[serde(default)]
    pub profile_image: Option<String>,
    /// Sign-in provider
    #[serde(default = "default_auth_provider")]
    pub auth_provider: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_auth_provider() -> String {
    "email".to_string()
}

impl User {
    /// First and last name joined, or the email when neither is set
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Editable profile fields of the signed-in admin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Given name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    /// Split a full name into first name and the rest
    #[must_use]
    pub fn from_full_name(name: &str) -> Self {
        let mut parts = name.split_whitespace();
        let first = parts.next().map(str::to_string);
        let rest = parts.collect::<Vec<_>>().join(" ");
        Self {
            first_name: first,
            last_name: (!rest.is_empty()).then_some(rest),
            phone_number: None,
        }
    }
}

/// Course (shown as a "theme" in the dashboard)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course id
    pub id: ResourceId,
    /// Course name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields of a course to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCourse {
    /// Course name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Lesson belonging to a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson id
    pub id: ResourceId,
    /// Owning course
    pub course_id: ResourceId,
    /// Lesson title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Video URL
    #[serde(default)]
    pub video_url: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields of a lesson to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLesson {
    /// Owning course
    pub course_id: ResourceId,
    /// Lesson title
    pub title: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update of a lesson
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonUpdate {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New video URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Quiz question attached to a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question id
    pub id: ResourceId,
    /// Lesson the question belongs to
    #[serde(default)]
    pub lesson_id: Option<ResourceId>,
    /// Course the question belongs to
    #[serde(default)]
    pub course_id: Option<ResourceId>,
    /// Question text
    pub question: String,
    /// Answer options
    #[serde(default)]
    pub options: Vec<String>,
    /// Correct answer
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Difficulty label
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Fields of a question to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    /// Lesson the question belongs to
    pub lesson_id: ResourceId,
    /// Question text
    pub question: String,
    /// Answer options
    pub options: Vec<String>,
    /// Correct answer
    pub correct_answer: String,
    /// Difficulty label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl NewQuestion {
    /// Drop blank options and check the question is complete
    ///
    /// # Errors
    ///
    /// Returns a validation error when the text is empty, fewer than two options
    /// remain, or the correct answer is not one of them.
    pub fn normalized(mut self) -> crate::Result<Self> {
        self.question = self.question.trim().to_string();
        self.options = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if self.question.is_empty() {
            return Err(crate::Error::validation("question", "question text is required"));
        }
        if self.options.len() < 2 {
            return Err(crate::Error::validation("options", "at least two options are required"));
        }
        if !self.options.iter().any(|o| o == self.correct_answer.trim()) {
            return Err(crate::Error::validation(
                "correct_answer",
                "correct answer must be one of the options",
            ));
        }
        Ok(self)
    }
}

/// Subscription plan offered to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    /// Plan id
    pub id: ResourceId,
    /// Plan title
    pub title: String,
    /// Price per period
    pub plan_price: f64,
    /// Billing period label
    pub duration: String,
    /// Feature bullet points
    #[serde(default)]
    pub features: Vec<String>,
}

/// Fields of a subscription plan to create or replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscriptionPlan {
    /// Plan title
    pub title: String,
    /// Price per period
    pub plan_price: f64,
    /// Billing period label
    pub duration: String,
    /// Feature bullet points
    pub features: Vec<String>,
}

impl NewSubscriptionPlan {
    /// Trim the title, drop blank features and check the price
    ///
    /// # Errors
    ///
    /// Returns a validation error when the title is empty or the price is
    /// negative or not finite.
    pub fn normalized(mut self) -> crate::Result<Self> {
        self.title = self.title.trim().to_string();
        self.features.retain(|f| !f.trim().is_empty());
        if self.title.is_empty() {
            return Err(crate::Error::validation("title", "Plan name is required."));
        }
        if !self.plan_price.is_finite() || self.plan_price < 0.0 {
            return Err(crate::Error::validation(
                "plan_price",
                "price must be a non-negative number",
            ));
        }
        Ok(self)
    }
}

/// One slice of the subscription distribution chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionShare {
    /// Plan label
    pub label: String,
    /// Share of users in percent
    pub percentage: f64,
    /// Number of users on the plan
    #[serde(default)]
    pub count: u64,
}

impl SubscriptionShare {
    /// Distribution shown when the backend returns nothing
    #[must_use]
    pub fn fallback() -> Vec<Self> {
        vec![Self {
            label: "Free".to_string(),
            percentage: 100.0,
            count: 0,
        }]
    }
}

/// One month of the user growth chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGrowthPoint {
    /// Month as `YYYY-MM`
    pub month: String,
    /// Users at the end of the month
    #[serde(default)]
    pub total_users: u64,
    /// Users who joined during the month
    #[serde(default)]
    pub new_users: u64,
    /// Growth as a fraction, when the backend computes it
    #[serde(default)]
    pub monthly_growth_rate: Option<f64>,
}

impl UserGrowthPoint {
    /// Year part of the month label
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.month.split('-').next().filter(|y| !y.is_empty())
    }
}

/// Per-course learning statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStats {
    /// Course name
    pub course_name: String,
    /// Enrolled students
    #[serde(default)]
    pub total_students: Option<u64>,
    /// Students who completed the course
    #[serde(default)]
    pub completed_count: Option<u64>,
    /// Average progress in percent
    #[serde(default)]
    pub average_progress: Option<f64>,
}
