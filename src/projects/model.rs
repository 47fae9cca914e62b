//! Project records and the shapes used to create, update and filter them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// == Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    Completed,
    Archived,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

// == Project ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    pub color: String,
    #[serde(default)]
    pub crew_count: u32,
    #[serde(default)]
    pub filled_positions: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Re-derives the colour from the current title.
    pub fn refresh_color(&mut self) {
        self.color = project_color(&self.title, Some(&self.color));
    }
}

// == New Project ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub crew_count: u32,
}

// == Project Update ==
/// Partial update; `None` leaves a field untouched.
///
/// `filled_positions` is not here: it follows the confirmed staff count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub crew_count: Option<u32>,
}

impl ProjectUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Applies the present fields to `project`.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
        if let Some(start) = self.start_date {
            project.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            project.end_date = Some(end);
        }
        if let Some(client_id) = &self.client_id {
            project.client_id = Some(client_id.clone());
        }
        if let Some(venue) = &self.venue_address {
            project.venue_address = Some(venue.clone());
        }
        if let Some(color) = &self.color {
            project.color = color.clone();
        }
        if let Some(crew) = self.crew_count {
            project.crew_count = crew;
        }
    }
}

// == Filter ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Projects starting on or after this date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Projects ending on or before this date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ProjectFilter {
    pub fn active(limit: usize) -> Self {
        Self {
            status: Some(ProjectStatus::Active),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        if project.is_deleted() {
            return false;
        }
        if self.status.is_some_and(|s| s != project.status) {
            return false;
        }
        if let Some(client_id) = &self.client_id {
            if project.client_id.as_ref() != Some(client_id) {
                return false;
            }
        }
        if let Some(from) = self.start_date {
            if project.start_date.map_or(true, |d| d < from) {
                return false;
            }
        }
        if let Some(to) = self.end_date {
            if project.end_date.map_or(true, |d| d > to) {
                return false;
            }
        }
        true
    }
}

// == Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_staff: u32,
    pub confirmed_staff: u32,
    pub total_expenses: f64,
    pub total_payments: f64,
    /// Confirmed staff as a percentage of all assigned staff
    pub completion_rate: f64,
}

impl ProjectStats {
    pub fn compute(
        staff: &[StaffStatus],
        approved_expenses: impl IntoIterator<Item = f64>,
        completed_payments: impl IntoIterator<Item = f64>,
    ) -> Self {
        let total_staff = staff.len() as u32;
        let confirmed_staff = staff
            .iter()
            .filter(|s| **s == StaffStatus::Confirmed)
            .count() as u32;
        let completion_rate = if total_staff > 0 {
            confirmed_staff as f64 / total_staff as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_staff,
            confirmed_staff,
            total_expenses: approved_expenses.into_iter().sum(),
            total_payments: completed_payments.into_iter().sum(),
            completion_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: f64,
    #[serde(default = "default_true")]
    pub completed: bool,
    #[serde(default = "today")]
    pub recorded_on: NaiveDate,
}

impl Payment {
    pub fn completed(amount: f64) -> Self {
        Self {
            amount,
            completed: true,
            recorded_on: today(),
        }
    }

    /// A payment still waiting in the payout queue.
    pub fn pending(amount: f64) -> Self {
        Self {
            completed: false,
            ..Self::completed(amount)
        }
    }
}

/// A payment together with the project it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub project_id: String,
    #[serde(flatten)]
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub amount: f64,
    #[serde(default)]
    pub approved: bool,
    #[serde(default = "today")]
    pub recorded_on: NaiveDate,
}

impl Expense {
    pub fn approved(amount: f64) -> Self {
        Self {
            amount,
            approved: true,
            recorded_on: today(),
        }
    }

    /// A claim that has not been approved yet.
    pub fn submitted(amount: f64) -> Self {
        Self {
            approved: false,
            ..Self::approved(amount)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub candidate_id: String,
    #[serde(default)]
    pub status: StaffStatus,
}

fn default_true() -> bool {
    true
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// == Analytics ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    /// Completed payments
    Payment,
    /// Approved expenses
    Expense,
}

impl AnalyticsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsKind::Payment => "payment",
            AnalyticsKind::Expense => "expense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            ReportPeriod::Daily => 1,
            ReportPeriod::Weekly => 7,
            ReportPeriod::Monthly => 30,
        }
    }

    /// Inclusive date range of the period ending on `last`.
    pub fn window(&self, last: NaiveDate) -> (NaiveDate, NaiveDate) {
        (last - Duration::days(self.days() - 1), last)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub kind: AnalyticsKind,
    pub period: ReportPeriod,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub count: usize,
    pub total: f64,
}

impl AnalyticsSummary {
    /// Sums the `(date, amount)` rows that fall inside the period ending on `last`.
    pub fn compute(
        kind: AnalyticsKind,
        period: ReportPeriod,
        last: NaiveDate,
        rows: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let (from, to) = period.window(last);
        let amounts: Vec<f64> = rows
            .into_iter()
            .filter(|(date, _)| (from..=to).contains(date))
            .map(|(_, amount)| amount)
            .collect();

        Self {
            kind,
            period,
            from,
            to,
            count: amounts.len(),
            total: amounts.iter().sum(),
        }
    }
}

// == Colours ==
const EVENT_COLORS: &[(&str, &str)] = &[
    ("nestle", "#FCA5A5"),
    ("ribena", "#DDD6FE"),
    ("mytown", "#FDA4AF"),
    ("warrior", "#93C5FD"),
    ("diy", "#FEF08A"),
    ("blackmores", "#E2E8F0"),
    ("lapasar", "#F9A8D4"),
    ("spritzer", "#BBF7D0"),
    ("redoxon", "#FDBA74"),
    ("double-mint", "#67E8F9"),
    ("softlan", "#E2E8F0"),
    ("colgate", "#FED7AA"),
    ("hsbc", "#FCA5A5"),
    ("asw", "#93C5FD"),
    ("lee-frozen", "#E2E8F0"),
    ("maggle", "#E2E8F0"),
    ("unifi", "#FEF9C3"),
    ("brands", "#BBF7D0"),
    ("oppo", "#93C5FD"),
    ("chrissy", "#F9A8D4"),
    ("xiao-mi", "#E2E8F0"),
    ("mcd", "#DDD6FE"),
    ("te", "#F472B6"),
    ("cpoc", "#86EFAC"),
    ("drora", "#FEF9C3"),
];

pub const DEFAULT_COLOR: &str = "#CBD5E1";

/// Picks the display colour: first brand keyword found in the title, then
/// the colour already set, then the default.
pub fn project_color(title: &str, current: Option<&str>) -> String {
    let title = title.to_lowercase();
    EVENT_COLORS
        .iter()
        .find(|(keyword, _)| title.contains(keyword))
        .map(|(_, color)| color.to_string())
        .or_else(|| current.filter(|c| !c.is_empty()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_COLOR.to_string())
}
