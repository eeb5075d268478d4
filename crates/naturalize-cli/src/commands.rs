//! Subcommand handlers
//!
//! Each handler performs its API call and turns the envelope into a
//! [`Report`]. The table builders take the envelope alone so they can be
//! checked without a backend. `login` and `whoami` only touch the stored
//! session files.

use crate::Commands;
use crate::table::Table;
use anyhow::Context;
use naturalize_client::{ApiService, CredentialProvider, FileCredentials, ResponseExt, Upload};
use naturalize_core::types::{
    Course, CourseStats, Lesson, NewSubscriptionPlan, SubscriptionPlan, SubscriptionShare, User,
    UserGrowthPoint,
};
use naturalize_core::utils::{
    StatusFilter, UserFilter, format_percent, growth_rate, paginate, rank_courses, status_label,
    weighted_average_progress,
};
use naturalize_core::ApiResponse;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

/// What a subcommand produced
#[derive(Debug, Clone)]
pub(crate) struct Report {
    envelope: ApiResponse,
    table: Option<Table>,
    summary: Option<String>,
}

impl Report {
    const fn new(envelope: ApiResponse) -> Self {
        Self {
            envelope,
            table: None,
            summary: None,
        }
    }

    fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Whether the underlying call succeeded
    pub(crate) const fn succeeded(&self) -> bool {
        self.envelope.success
    }

    /// Text for stdout; empty when there is nothing to add to the notices
    pub(crate) fn render(&self, json: bool) -> anyhow::Result<String> {
        if json {
            return Ok(serde_json::to_string_pretty(&self.envelope)?);
        }
        if !self.envelope.success {
            return Ok(String::new());
        }

        let mut out = String::new();
        if let Some(table) = &self.table {
            out.push_str(&table.to_string());
        }
        if let Some(summary) = &self.summary {
            out.push_str(summary);
        }
        Ok(out.trim_end().to_string())
    }
}

/// Stored session files plus the token given on the command line
#[derive(Debug, Clone, Default)]
pub(crate) struct SignIn {
    pub(crate) files: Option<FileCredentials>,
    pub(crate) token: Option<String>,
}

impl SignIn {
    fn files(&self) -> anyhow::Result<&FileCredentials> {
        self.files
            .as_ref()
            .context("no place to keep credentials: set auth.token_file")
    }
}

/// Payload of a successful envelope; `None` for a failure
fn decoded<T: DeserializeOwned>(envelope: &ApiResponse) -> anyhow::Result<Option<T>> {
    if !envelope.success {
        return Ok(None);
    }
    let payload = envelope
        .decode()
        .context("response payload did not have the expected shape")?;
    Ok(Some(payload))
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Run one subcommand against the API
pub(crate) async fn execute(
    api: &ApiService,
    sign_in: &SignIn,
    command: Commands,
) -> anyhow::Result<Report> {
    debug!(?command, "running command");
    match command {
        Commands::Login { user } => login(sign_in, user.as_deref()).await,
        Commands::Logout => {
            api.logout().await;
            Ok(Report::new(ApiResponse::ok(None, "Signed out")).summary("Signed out"))
        }
        Commands::Whoami => whoami(sign_in).await,
        Commands::Users {
            status,
            plan,
            search,
            page,
            per_page,
        } => {
            let filter = UserFilter {
                status: status.unwrap_or_default(),
                plan,
                search: search.unwrap_or_default(),
            };
            let envelope = match filter.status {
                StatusFilter::Only(status) => api.list_users_by_status(status).await,
                StatusFilter::All => api.list_users().await,
            };
            users_report(envelope, &filter, page, per_page)
        }
        Commands::User { id } => Ok(detail_report(api.user_detail(&id).await)),
        Commands::SetStatus { id, status } => {
            Ok(Report::new(api.change_user_status(&id, status).await))
        }
        Commands::DeleteUser { id } => Ok(Report::new(api.delete_user(&id).await)),
        Commands::Courses => courses_report(api.list_courses().await),
        Commands::Lessons { course_id } => lessons_report(api.lessons_by_course(&course_id).await),
        Commands::Plans { skip, limit } => plans_report(api.list_plans(skip, limit).await),
        Commands::CreatePlan {
            title,
            price,
            duration,
            features,
        } => {
            let plan = NewSubscriptionPlan {
                title,
                plan_price: price,
                duration,
                features,
            };
            Ok(Report::new(api.create_plan(plan).await?))
        }
        Commands::DeletePlan { id } => Ok(Report::new(api.delete_plan(&id).await)),
        Commands::Distribution => distribution_report(api.subscription_distribution().await),
        Commands::Growth => growth_report(api.user_growth().await),
        Commands::CourseStats => course_stats_report(api.all_courses_stats().await),
        Commands::Download { path, dest } => {
            let envelope = api.download_file(&path, &dest, api.options()).await;
            Ok(download_report(envelope))
        }
        Commands::Upload { path, file, field } => {
            let upload = Upload::from_path(field, &file).await?;
            Ok(Report::new(api.upload_file(&path, upload, api.options()).await))
        }
    }
}

async fn login(sign_in: &SignIn, user: Option<&str>) -> anyhow::Result<Report> {
    let files = sign_in.files()?;
    let token = sign_in
        .token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
        .context("login needs a token: pass --token or set NATURALIZE_TOKEN")?;
    let user = user
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--user is not valid JSON")?;

    files.store(token, user.as_ref()).await?;
    info!(path = %files.token_file().display(), "signed in");
    Ok(Report::new(ApiResponse::ok(user, "Signed in"))
        .summary(format!("Token saved to {}", files.token_file().display())))
}

async fn whoami(sign_in: &SignIn) -> anyhow::Result<Report> {
    let files = sign_in.files()?;
    if files.token().await.is_none() {
        anyhow::bail!("not signed in");
    }
    let user = files.user().await;
    let email = user
        .as_ref()
        .and_then(|user| user.get("email"))
        .and_then(Value::as_str);
    let summary = email.map_or_else(|| "Signed in".to_string(), |email| format!("Signed in as {email}"));
    Ok(Report::new(ApiResponse::ok(user, "Signed in")).summary(summary))
}

fn users_report(
    envelope: ApiResponse,
    filter: &UserFilter,
    page: usize,
    per_page: usize,
) -> anyhow::Result<Report> {
    let Some(users) = decoded::<Vec<User>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };

    let matching = filter.apply(&users);
    let shown = paginate(&matching, page, per_page);

    let mut table = Table::new(["ID", "NAME", "EMAIL", "PLAN", "STATUS"]);
    for user in shown.items {
        table.row([
            user.id.clone(),
            user.display_name(),
            user.email.clone(),
            user.plan.to_string(),
            status_label(user.account_status).to_string(),
        ]);
    }

    let summary = if shown.items.is_empty() {
        format!("No users on page {} ({} matching)", shown.page, shown.total)
    } else {
        format!(
            "Showing {}-{} of {} users (page {} of {})",
            shown.first_index(),
            shown.first_index() + shown.items.len() - 1,
            shown.total,
            shown.page,
            shown.total_pages
        )
    };

    let mut envelope = envelope;
    envelope.data = Some(json!({
        "items": shown.items,
        "page": shown.page,
        "per_page": shown.per_page,
        "total": shown.total,
        "total_pages": shown.total_pages,
    }));
    Ok(Report::new(envelope).table(table).summary(summary))
}

fn detail_report(envelope: ApiResponse) -> Report {
    let Some(Value::Object(fields)) = envelope.data.clone() else {
        let summary = envelope
            .data
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        return Report::new(envelope).summary(summary);
    };

    let mut table = Table::new(["FIELD", "VALUE"]);
    for (key, value) in fields {
        let shown = match value {
            Value::String(text) => text,
            Value::Null => "-".to_string(),
            other => other.to_string(),
        };
        table.row([key, shown]);
    }
    Report::new(envelope).table(table)
}

fn courses_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(courses) = decoded::<Vec<Course>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    let mut table = Table::new(["ID", "NAME", "DESCRIPTION"]);
    for course in &courses {
        table.row([
            course.id.to_string(),
            course.name.clone(),
            cell(course.description.as_deref()),
        ]);
    }
    let summary = format!("{} courses", courses.len());
    Ok(Report::new(envelope).table(table).summary(summary))
}

fn lessons_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(lessons) = decoded::<Vec<Lesson>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    let mut table = Table::new(["ID", "TITLE", "VIDEO"]);
    for lesson in &lessons {
        table.row([
            lesson.id.to_string(),
            lesson.title.clone(),
            cell(lesson.video_url.as_deref()),
        ]);
    }
    Ok(Report::new(envelope).table(table))
}

fn plans_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(plans) = decoded::<Vec<SubscriptionPlan>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    let mut table = Table::new(["ID", "TITLE", "PRICE", "DURATION", "FEATURES"]);
    for plan in &plans {
        table.row([
            plan.id.to_string(),
            plan.title.clone(),
            format!("{:.2}", plan.plan_price),
            plan.duration.clone(),
            plan.features.join(", "),
        ]);
    }
    Ok(Report::new(envelope).table(table))
}

fn distribution_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(mut shares) = decoded::<Vec<SubscriptionShare>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    if shares.is_empty() {
        shares = SubscriptionShare::fallback();
    }
    let mut table = Table::new(["PLAN", "USERS", "SHARE"]);
    for share in &shares {
        table.row([
            share.label.clone(),
            share.count.to_string(),
            format!("{}%", format_percent(share.percentage, 1)),
        ]);
    }
    Ok(Report::new(envelope).table(table))
}

fn growth_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(points) = decoded::<Vec<UserGrowthPoint>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    let mut table = Table::new(["MONTH", "TOTAL", "NEW", "GROWTH"]);
    for point in &points {
        table.row([
            point.month.clone(),
            point.total_users.to_string(),
            point.new_users.to_string(),
            format!("{}%", growth_rate(point)),
        ]);
    }
    Ok(Report::new(envelope).table(table))
}

fn course_stats_report(envelope: ApiResponse) -> anyhow::Result<Report> {
    let Some(stats) = decoded::<Vec<CourseStats>>(&envelope)? else {
        return Ok(Report::new(envelope));
    };
    let mut table = Table::new(["RANK", "COURSE", "COMPLETIONS", "PROGRESS"]);
    for (rank, course) in rank_courses(&stats).iter().enumerate() {
        table.row([
            (rank + 1).to_string(),
            course.name.clone(),
            course.completions.to_string(),
            format!("{}%", course.percentage),
        ]);
    }
    let summary = weighted_average_progress(&stats).map_or_else(
        || "No course statistics yet".to_string(),
        |average| format!("Average progress: {}%", format_percent(average, 1)),
    );
    Ok(Report::new(envelope).table(table).summary(summary))
}

fn download_report(envelope: ApiResponse) -> Report {
    let saved = envelope.data.as_ref().and_then(|data| {
        let path = data.get("path")?.as_str()?;
        let bytes = data.get("bytes")?.as_u64()?;
        Some(format!("Saved {bytes} bytes to {path}"))
    });
    let mut report = Report::new(envelope);
    report.summary = saved;
    report
}
