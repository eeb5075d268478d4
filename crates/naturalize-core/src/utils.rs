//! Table and chart arithmetic used by the dashboard views

use crate::types::{AccountStatus, CourseStats, PlanTier, User, UserGrowthPoint};

/// One page of a client-side paginated table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Items on this page
    pub items: &'a [T],
    /// 1-based page number that was requested
    pub page: usize,
    /// Page size
    pub per_page: usize,
    /// Number of items across all pages
    pub total: usize,
    /// Number of pages (zero for an empty table)
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    /// Whether a previous page exists
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based index of the first item shown, zero when the page is empty
    #[must_use]
    pub const fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }
}

/// Slice `items` into the requested 1-based page
///
/// Pages outside `1..=total_pages` and a zero page size produce an empty page.
#[must_use]
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let total = items.len();
    let total_pages = if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    };

    let slice = if page == 0 || per_page == 0 {
        &[][..]
    } else {
        let start = (page - 1).saturating_mul(per_page);
        let end = start.saturating_add(per_page).min(total);
        items.get(start..end).unwrap_or(&[])
    };

    Page {
        items: slice,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Status column filter of the user table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every status
    #[default]
    All,
    /// Only the given status
    Only(AccountStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty()
            || token.eq_ignore_ascii_case("all")
            || token.eq_ignore_ascii_case("all status")
        {
            Ok(Self::All)
        } else {
            token.parse().map(Self::Only)
        }
    }
}

/// Filters applied to the user table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Status filter
    pub status: StatusFilter,
    /// Plan filter (`None` shows every plan)
    pub plan: Option<PlanTier>,
    /// Free-text search over name, email and id
    pub search: String,
}

impl UserFilter {
    /// Whether a user passes every filter
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        let status_match = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => user.account_status == status,
        };
        let plan_match = self.plan.is_none_or(|plan| user.plan == plan);
        let search_match = filter_text(
            &[
                user.display_name().as_str(),
                user.email.as_str(),
                user.id.as_str(),
            ],
            &self.search,
        );
        status_match && plan_match && search_match
    }

    /// Users passing every filter, in input order
    #[must_use]
    pub fn apply<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|user| self.matches(user)).collect()
    }
}

/// Case-insensitive "contains" across several fields; an empty needle matches
#[must_use]
pub fn filter_text(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
        || haystacks
            .iter()
            .any(|hay| hay.to_lowercase().contains(&needle))
}

/// `part` as a percentage of `whole`; zero when `whole` is not positive
#[must_use]
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Round to a fixed number of decimals
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Format a percentage with a fixed number of decimals, without the `%` sign
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

/// Growth rate label of a month, one decimal
///
/// Uses the backend's monthly rate when present, otherwise new users over
/// total users, and `0.0` for an empty month.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn growth_rate(point: &UserGrowthPoint) -> String {
    let rate = match point.monthly_growth_rate {
        Some(rate) => rate * 100.0,
        None if point.total_users > 0 => {
            percentage(point.new_users as f64, point.total_users as f64)
        }
        None => 0.0,
    };
    format_percent(rate, 1)
}

/// Average course progress weighted by enrolment, one decimal
///
/// Falls back to a plain mean when no course reports students; `None` for an
/// empty list or a non-finite result.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weighted_average_progress(stats: &[CourseStats]) -> Option<f64> {
    if stats.is_empty() {
        return None;
    }

    let total_students: u64 = stats.iter().filter_map(|s| s.total_students).sum();
    let average = if total_students > 0 {
        let weighted: f64 = stats
            .iter()
            .map(|s| s.average_progress.unwrap_or(0.0) * s.total_students.unwrap_or(0) as f64)
            .sum();
        weighted / total_students as f64
    } else {
        stats
            .iter()
            .map(|s| s.average_progress.unwrap_or(0.0))
            .sum::<f64>()
            / stats.len() as f64
    };

    average.is_finite().then(|| round_to(average, 1))
}

/// A course as shown in the top-themes list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRanking {
    /// Course name
    pub name: String,
    /// Completions (enrolment when the backend omits completions)
    pub completions: u64,
    /// Rounded average progress in percent
    pub percentage: u32,
}

/// Courses ordered by rounded average progress, best first
///
/// Ties keep the backend's order.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rank_courses(stats: &[CourseStats]) -> Vec<CourseRanking> {
    let mut ranked: Vec<CourseRanking> = stats
        .iter()
        .map(|s| CourseRanking {
            name: s.course_name.clone(),
            completions: s.completed_count.or(s.total_students).unwrap_or(0),
            percentage: s.average_progress.unwrap_or(0.0).clamp(0.0, 100.0).round() as u32,
        })
        .collect();
    ranked.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    ranked
}

/// Label shown in the status column for an account status
#[must_use]
pub fn status_label(status: AccountStatus) -> &'static str {
    match status {
        AccountStatus::Active => "Active",
        AccountStatus::Inactive => "Inactive",
        AccountStatus::Suspended => "Suspended",
    }
}
