//! Naturalize admin command line tool
//!
//! Runs the dashboard's API calls from a terminal and prints either the
//! response envelope as JSON or a plain table.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

mod commands;
mod table;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::SignIn;
use naturalize_client::{
    ApiService, ApiServiceBuilder, FileCredentials, Notice, NoticeLevel, Notifier,
};
use naturalize_core::types::{AccountStatus, PlanTier};
use naturalize_core::utils::StatusFilter;
use naturalize_core::{Config, ResourceId};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Command line interface for the Naturalize admin tool
#[derive(Parser, Debug)]
#[command(
    name = "naturalize-admin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Admin tool for the Naturalize learning platform",
    long_about = "Manage users, courses, lessons and subscription plans of the Naturalize learning platform, and read the dashboard statistics, from the command line."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// API base URL (overrides the configuration)
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Bearer token to use instead of the stored one
    #[arg(
        long,
        value_name = "TOKEN",
        env = "NATURALIZE_TOKEN",
        hide_env_values = true,
        global = true
    )]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Print the response envelope as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Save the token given with --token (or NATURALIZE_TOKEN) as the signed-in session
    Login {
        /// Signed-in user's record, as JSON
        #[arg(long, value_name = "JSON")]
        user: Option<String>,
    },

    /// Forget the stored token and user record
    Logout,

    /// Show who the stored session belongs to
    Whoami,

    /// List users
    Users {
        /// Only users with this account status (active, inactive, suspended, all)
        #[arg(long, value_name = "STATUS")]
        status: Option<StatusFilter>,

        /// Only users on this plan (free, basic, premium)
        #[arg(long, value_name = "PLAN")]
        plan: Option<PlanTier>,

        /// Case-insensitive search over name, email and id
        #[arg(short, long, value_name = "TEXT")]
        search: Option<String>,

        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Users per page
        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },

    /// Show one user's details
    User {
        /// User id
        id: ResourceId,
    },

    /// Change a user's account status
    SetStatus {
        /// User id
        id: ResourceId,
        /// New status (active, inactive, suspended)
        status: AccountStatus,
    },

    /// Delete a user
    DeleteUser {
        /// User id
        id: ResourceId,
    },

    /// List courses
    Courses,

    /// List the lessons of a course
    Lessons {
        /// Course id
        course_id: ResourceId,
    },

    /// List subscription plans
    Plans {
        /// Plans to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Plans to return
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Create a subscription plan
    CreatePlan {
        /// Plan title
        #[arg(long)]
        title: String,

        /// Price per period
        #[arg(long)]
        price: f64,

        /// Billing period label
        #[arg(long, default_value = "Monthly")]
        duration: String,

        /// Feature bullet point (repeatable)
        #[arg(long = "feature", value_name = "TEXT")]
        features: Vec<String>,
    },

    /// Delete a subscription plan
    DeletePlan {
        /// Plan id
        id: ResourceId,
    },

    /// Show how users are spread across plans
    Distribution,

    /// Show monthly user growth
    Growth,

    /// Show course progress statistics
    CourseStats,

    /// Download a file from the API
    Download {
        /// API path to download
        path: String,
        /// Where to write the file
        dest: PathBuf,
    },

    /// Upload a file to the API
    Upload {
        /// API path to upload to
        path: String,
        /// File to send
        file: PathBuf,
        /// Multipart field name
        #[arg(long, default_value = "file")]
        field: String,
    },
}

/// Prints notices to stderr
#[derive(Debug, Default, Clone, Copy)]
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("ok: {}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

/// Main entry point for the admin tool
///
/// # Errors
///
/// Returns error if configuration, logging or the service cannot be set up,
/// or a command fails before it reaches the API
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    naturalize_core::init_logging(&config.logging)?;
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        "naturalize-admin starting"
    );

    // Logout acts on the stored session, never on a --token override
    let override_token = cli
        .token
        .as_deref()
        .filter(|_| !matches!(cli.command, Commands::Logout));
    let api = build_service(&config, override_token)?;
    let sign_in = SignIn {
        files: FileCredentials::from_config(&config.auth),
        token: cli.token.clone(),
    };
    let report = commands::execute(&api, &sign_in, cli.command).await?;

    let output = report.render(cli.json)?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load configuration and apply command line overrides
///
/// # Errors
///
/// Returns error if the configuration cannot be read or the overrides make it invalid
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(base_url) = &cli.base_url {
        config.api.base_url.clone_from(base_url);
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }

    config.validate().context("invalid command line override")?;
    Ok(config)
}

/// Build the API service for this invocation
///
/// # Errors
///
/// Returns error if the base URL is unusable
fn build_service(config: &Config, token: Option<&str>) -> anyhow::Result<ApiService> {
    let mut builder = ApiServiceBuilder::from_config(config).notifier(ConsoleNotifier);
    if let Some(token) = token {
        builder = builder.token(token);
    }
    Ok(builder.build()?)
}
