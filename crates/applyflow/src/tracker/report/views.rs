use super::super::domain::{
    ApplicationStatus, CompanyTier, DateRange, InterviewId, InterviewStatus, ReferralId,
    ReferralStatus, ResumeId,
};
use super::super::records::Application;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount<S> {
    pub status: S,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub by_status: Vec<StatusCount<ApplicationStatus>>,
    pub active: usize,
    pub response_rate: f64,
    pub success_rate: f64,
}

impl ApplicationStats {
    pub fn count(&self, status: ApplicationStatus) -> usize {
        self.by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralStats {
    pub total: usize,
    pub by_status: Vec<StatusCount<ReferralStatus>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopResume {
    pub id: ResumeId,
    pub version_name: String,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeStats {
    pub total: usize,
    pub total_used: u64,
    pub average_success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_resume: Option<TopResume>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewStats {
    pub total: usize,
    pub by_status: Vec<StatusCount<InterviewStatus>>,
    pub upcoming: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub applications: ApplicationStats,
    pub referrals: ReferralStats,
    pub resumes: ResumeStats,
    pub interviews: InterviewStats,
}

/// One kanban column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: ApplicationStatus,
    pub label: &'static str,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "interview")]
    Interview,
    #[serde(rename = "referral-followup")]
    ReferralFollowUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_id: Option<InterviewId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<ReferralId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starts_at: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub status: &'static str,
    pub metadata: EventMetadata,
}

impl CalendarEvent {
    pub fn day(&self) -> NaiveDate {
        self.starts_at.date()
    }
}

/// Relative period an event falls into, at day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Later,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodBuckets {
    pub overdue: Vec<CalendarEvent>,
    pub today: Vec<CalendarEvent>,
    pub tomorrow: Vec<CalendarEvent>,
    pub this_week: Vec<CalendarEvent>,
    pub later: Vec<CalendarEvent>,
}

impl PeriodBuckets {
    pub fn bucket(&self, period: Period) -> &[CalendarEvent] {
        match period {
            Period::Overdue => &self.overdue,
            Period::Today => &self.today,
            Period::Tomorrow => &self.tomorrow,
            Period::ThisWeek => &self.this_week,
            Period::Later => &self.later,
        }
    }

    pub fn len(&self) -> usize {
        self.overdue.len()
            + self.today.len()
            + self.tomorrow.len()
            + self.this_week.len()
            + self.later.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodayItems {
    pub interviews: Vec<CalendarEvent>,
    pub follow_ups: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub label: String,
    /// Empty cells before the first day, Sunday-first.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl MonthGrid {
    /// Rows of seven cells, padding included.
    pub fn weeks(&self) -> Vec<Vec<Option<&CalendarDay>>> {
        let blanks = std::iter::repeat(None).take(self.leading_blanks as usize);
        let cells: Vec<Option<&CalendarDay>> = blanks.chain(self.days.iter().map(Some)).collect();
        cells
            .chunks(7)
            .map(|row| {
                let mut row = row.to_vec();
                row.resize(7, None);
                row
            })
            .collect()
    }

    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.days
            .iter()
            .find(|day| day.date == date)
            .map(|day| day.events.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeAnalytics {
    pub resume_id: Option<ResumeId>,
    pub resume_name: String,
    pub total_applications: usize,
    pub responses: usize,
    pub response_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAnalytics {
    pub tier: CompanyTier,
    pub total_applications: usize,
    pub offers: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    Referral,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAnalytics {
    #[serde(rename = "type")]
    pub channel: Channel,
    pub total_applications: usize,
    pub responses: usize,
    pub response_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeMetrics {
    pub avg_time_to_response: f64,
    pub avg_time_to_offer: f64,
    pub responses_measured: usize,
    pub offers_measured: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub stage: ApplicationStatus,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAnalytics {
    pub day: &'static str,
    pub applications: usize,
    pub responses: usize,
    pub response_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyMetrics {
    pub company_name: String,
    pub total_applications: usize,
    pub responses: usize,
    /// Mean over responded applications only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_days: Option<f64>,
    pub offers: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub applications: usize,
    pub offers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub range: DateRange,
    pub total_applications: usize,
    pub by_resume: Vec<ResumeAnalytics>,
    pub by_tier: Vec<TierAnalytics>,
    pub referral_vs_direct: Vec<ChannelAnalytics>,
    pub time_metrics: TimeMetrics,
    pub funnel: Vec<FunnelStage>,
    pub by_weekday: Vec<DayAnalytics>,
    pub fastest_companies: Vec<CompanyMetrics>,
    pub company_success: Vec<CompanyMetrics>,
    pub monthly_trend: Vec<MonthlyTrend>,
}
