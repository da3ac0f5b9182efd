use crate::infra::{InMemoryResumeStorage, InMemoryTrackerRepository, TrackerSnapshot};
use applyflow::config::TrackerConfig;
use applyflow::error::AppError;
use applyflow::tracker::report::views::{
    AnalyticsReport, CalendarEvent, DashboardStats, Period, PeriodBuckets,
};
use applyflow::tracker::{
    ActivityItem, DateRange, ResumeStorage, TrackerRepository, TrackerService, UserId,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Owner assigned to snapshot records when no user is named.
pub(crate) const LOCAL_USER: &str = "local";

/// Dashboard, analytics and calendar outlook for one user, as printed by the
/// CLI and returned by the snapshot endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct TrackerReport {
    pub(crate) user: UserId,
    pub(crate) today: NaiveDate,
    pub(crate) dashboard: DashboardStats,
    pub(crate) analytics: AnalyticsReport,
    pub(crate) upcoming: PeriodBuckets,
    pub(crate) recent_activity: Vec<ActivityItem>,
}

/// The report clock: midnight of `today` when pinned, otherwise the current UTC time.
pub(crate) fn report_clock(today: Option<NaiveDate>) -> NaiveDateTime {
    match today {
        Some(day) => day.and_time(NaiveTime::default()),
        None => Utc::now().naive_utc(),
    }
}

pub(crate) fn build_report<R, S>(
    service: &TrackerService<R, S>,
    user: &UserId,
    range: DateRange,
    now: NaiveDateTime,
) -> Result<TrackerReport, AppError>
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let today = now.date();
    debug!(user = %user, %today, ?range, "building tracker report");
    Ok(TrackerReport {
        user: user.clone(),
        today,
        dashboard: service.dashboard(user, now)?,
        analytics: service.analytics(user, range)?,
        upcoming: service.upcoming(user, today)?,
        recent_activity: service.recent_activity(user, None)?,
    })
}

/// Runs the report over an exported snapshot without touching any live store.
/// Every record is claimed by `user`.
pub(crate) fn snapshot_report(
    user: &UserId,
    snapshot: TrackerSnapshot,
    range: DateRange,
    now: NaiveDateTime,
    config: TrackerConfig,
) -> Result<TrackerReport, AppError> {
    let repository = Arc::new(InMemoryTrackerRepository::from_snapshot(user, snapshot));
    let storage = Arc::new(InMemoryResumeStorage::default());
    let service = TrackerService::new(repository, storage, config);
    build_report(&service, user, range, now)
}

fn describe_range(range: &DateRange) -> String {
    match (range.start, range.end) {
        (None, None) => "all time".to_string(),
        (Some(start), None) => format!("since {start}"),
        (None, Some(end)) => format!("through {end}"),
        (Some(start), Some(end)) => format!("{start} to {end}"),
    }
}

fn render_event(event: &CalendarEvent) {
    println!(
        "    - {} {} | {} [{}]",
        event.starts_at.format("%Y-%m-%d %H:%M"),
        event.title,
        event.description,
        event.status
    );
}

pub(crate) fn render_report(report: &TrackerReport) {
    let dashboard = &report.dashboard;
    let applications = &dashboard.applications;

    println!("ApplyFlow report for {} (as of {})", report.user, report.today);
    println!(
        "\nApplications: {} total | {} active | {:.1}% response rate | {:.1}% success rate",
        applications.total,
        applications.active,
        applications.response_rate,
        applications.success_rate
    );
    for entry in applications.by_status.iter().filter(|entry| entry.count > 0) {
        println!("  - {}: {}", entry.label, entry.count);
    }
    println!("Referrals: {}", dashboard.referrals.total);
    for entry in dashboard
        .referrals
        .by_status
        .iter()
        .filter(|entry| entry.count > 0)
    {
        println!("  - {}: {}", entry.label, entry.count);
    }
    println!(
        "Resumes: {} versions | used {} times | {:.1}% average success",
        dashboard.resumes.total, dashboard.resumes.total_used, dashboard.resumes.average_success_rate
    );
    if let Some(top) = &dashboard.resumes.top_resume {
        println!("  Top resume: {} ({:.1}%)", top.version_name, top.success_rate);
    }
    println!(
        "Interviews: {} total | {} upcoming",
        dashboard.interviews.total, dashboard.interviews.upcoming
    );

    let analytics = &report.analytics;
    println!(
        "\nAnalytics ({}): {} applications",
        describe_range(&analytics.range),
        analytics.total_applications
    );
    println!("Funnel");
    for stage in &analytics.funnel {
        println!("  - {}: {} ({:.1}%)", stage.stage, stage.count, stage.percentage);
    }
    println!(
        "Average days to response {:.1} ({} measured) | to offer {:.1} ({} measured)",
        analytics.time_metrics.avg_time_to_response,
        analytics.time_metrics.responses_measured,
        analytics.time_metrics.avg_time_to_offer,
        analytics.time_metrics.offers_measured
    );
    println!("Referral vs direct");
    for row in &analytics.referral_vs_direct {
        println!(
            "  - {:?}: {} applications | {:.1}% response",
            row.channel, row.total_applications, row.response_rate
        );
    }
    if !analytics.by_tier.is_empty() {
        println!("Company tiers");
        for row in &analytics.by_tier {
            println!(
                "  - {}: {} applications | {} offers | {:.1}% success",
                row.tier, row.total_applications, row.offers, row.success_rate
            );
        }
    }
    if !analytics.by_resume.is_empty() {
        println!("Resume versions");
        for row in &analytics.by_resume {
            println!(
                "  - {}: {} applications | {:.1}% response",
                row.resume_name, row.total_applications, row.response_rate
            );
        }
    }
    if !analytics.fastest_companies.is_empty() {
        println!("Fastest responders");
        for row in &analytics.fastest_companies {
            println!(
                "  - {}: {:.1} days over {} responses",
                row.company_name,
                row.avg_response_days.unwrap_or_default(),
                row.responses
            );
        }
    }
    if !analytics.monthly_trend.is_empty() {
        println!("Monthly trend");
        for row in &analytics.monthly_trend {
            println!(
                "  - {}: {} applications | {} offers",
                row.label, row.applications, row.offers
            );
        }
    }

    println!("\nUpcoming");
    if report.upcoming.is_empty() {
        println!("  Nothing scheduled");
    }
    for (label, period) in [
        ("Overdue", Period::Overdue),
        ("Today", Period::Today),
        ("Tomorrow", Period::Tomorrow),
        ("This week", Period::ThisWeek),
        ("Later", Period::Later),
    ] {
        let events = report.upcoming.bucket(period);
        if events.is_empty() {
            continue;
        }
        println!("  {label}");
        for event in events {
            render_event(event);
        }
    }

    if !report.recent_activity.is_empty() {
        println!("\nRecent activity");
        for item in &report.recent_activity {
            println!("  - {}: {}", item.title, item.description);
        }
    }
}
