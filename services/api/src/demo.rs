use crate::infra::{InMemoryResumeStorage, InMemoryTrackerRepository, TrackerSnapshot};
use crate::report::{
    build_report, render_report, report_clock, snapshot_report, TrackerReport, LOCAL_USER,
};
use applyflow::config::{AppConfig, TrackerConfig};
use applyflow::error::AppError;
use applyflow::tracker::{
    ApplicationPatch, ApplicationSource, ApplicationStatus, CompanyTier, DateRange,
    InterviewStatus, NewApplication, NewInterview, NewReferral, Priority, ReferralStatus,
    ResumePatch, ResumeStorage, ResumeUpload, TrackerRepository, TrackerService, UserId,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Exported tracker snapshot (JSON with applications, referrals, resumes, interviews)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// First applied date included in analytics (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Last applied date included in analytics (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) end: Option<NaiveDate>,
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// User the snapshot records belong to
    #[arg(long, default_value = LOCAL_USER)]
    pub(crate) user: String,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        snapshot,
        start,
        end,
        today,
        user,
        json,
    } = args;

    let config = AppConfig::load()?;
    let snapshot = load_snapshot(&snapshot)?;
    let report = snapshot_report(
        &UserId::from(user.as_str()),
        snapshot,
        DateRange { start, end },
        report_clock(today),
        config.tracker,
    )?;
    print_report(&report, json)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, json } = args;

    let now = report_clock(today);
    let user = UserId::from("demo");
    let service = TrackerService::new(
        Arc::new(InMemoryTrackerRepository::default()),
        Arc::new(InMemoryResumeStorage::default()),
        TrackerConfig::default(),
    );

    seed_job_search(&service, &user, now.date())?;
    let report = build_report(&service, &user, DateRange::unbounded(), now)?;

    if !json {
        println!("ApplyFlow demo\n");
    }
    print_report(&report, json)
}

pub(crate) fn load_snapshot(path: &Path) -> Result<TrackerSnapshot, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: TrackerSnapshot = serde_json::from_str(&raw)?;
    debug!(
        path = %path.display(),
        applications = snapshot.applications.len(),
        interviews = snapshot.interviews.len(),
        "loaded tracker snapshot"
    );
    Ok(snapshot)
}

fn print_report(report: &TrackerReport, json: bool) -> Result<(), AppError> {
    if json {
        let body = serde_json::to_string_pretty(report).map_err(std::io::Error::from)?;
        println!("{body}");
    } else {
        render_report(report);
    }
    Ok(())
}

fn at(day: NaiveDate, hour: i64) -> NaiveDateTime {
    day.and_time(NaiveTime::default()) + Duration::hours(hour)
}

fn pdf(version_name: &str, file_name: &str) -> ResumeUpload {
    ResumeUpload {
        version_name: version_name.to_string(),
        file_name: file_name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7 sample resume".to_vec(),
    }
}

/// Seeds a month and a half of job hunting, dated relative to `today`.
pub(crate) fn seed_job_search<R, S>(
    service: &TrackerService<R, S>,
    user: &UserId,
    today: NaiveDate,
) -> Result<(), AppError>
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let days_ago = |days: i64| today - Duration::days(days);
    let days_ahead = |days: i64| today + Duration::days(days);

    let backend = service.upload_resume(user, pdf("Backend v3", "backend-v3.pdf"))?;
    let platform = service.upload_resume(user, pdf("Platform v1", "platform-v1.pdf"))?;
    service.update_resume(
        user,
        &backend.id,
        ResumePatch {
            times_used: Some(3),
            success_rate: Some(66.7),
            ..ResumePatch::default()
        },
    )?;
    service.update_resume(
        user,
        &platform.id,
        ResumePatch {
            times_used: Some(1),
            success_rate: Some(100.0),
            ..ResumePatch::default()
        },
    )?;

    let priya = service.create_referral(
        user,
        NewReferral {
            relationship: Some("Former teammate".to_string()),
            date_asked: Some(days_ago(45)),
            status: ReferralStatus::Agreed,
            follow_up_date: Some(days_ahead(2)),
            ..NewReferral::new("Priya Raman", "Acme")
        },
    )?;
    service.create_referral(
        user,
        NewReferral {
            date_asked: Some(days_ago(5)),
            follow_up_date: Some(today),
            ..NewReferral::new("Sam Ortiz", "Globex")
        },
    )?;

    let acme = service.create_application(
        user,
        NewApplication {
            source: Some(ApplicationSource::Referral),
            company_tier: Some(CompanyTier::Faang),
            resume_id: Some(backend.id.clone()),
            referral_id: Some(priya.id.clone()),
            priority: Priority::High,
            tech_stack: vec!["Rust".to_string(), "Postgres".to_string()],
            ..NewApplication::new("Acme", "Backend Engineer", days_ago(40))
        },
    )?;
    let globex = service.create_application(
        user,
        NewApplication {
            source: Some(ApplicationSource::LinkedIn),
            company_tier: Some(CompanyTier::Startup),
            resume_id: Some(platform.id.clone()),
            ..NewApplication::new("Globex", "Platform Engineer", days_ago(21))
        },
    )?;
    let hooli = service.create_application(
        user,
        NewApplication {
            company_tier: Some(CompanyTier::Unicorn),
            resume_id: Some(backend.id.clone()),
            ..NewApplication::new("Hooli", "Site Reliability Engineer", days_ago(30))
        },
    )?;
    let umbrella = service.create_application(
        user,
        NewApplication {
            source: Some(ApplicationSource::CompanyPortal),
            ..NewApplication::new("Umbrella", "Backend Engineer", days_ago(50))
        },
    )?;
    service.create_application(
        user,
        NewApplication {
            source: Some(ApplicationSource::WellFound),
            company_tier: Some(CompanyTier::MidSize),
            ..NewApplication::new("Initech", "Data Engineer", days_ago(9))
        },
    )?;

    service.update_application(
        user,
        &acme.id,
        ApplicationPatch {
            status: Some(ApplicationStatus::Offer),
            response_date: Some(Some(days_ago(33))),
            offer_date: Some(Some(days_ago(12))),
            salary_range: Some(Some("$180k - $210k".to_string())),
            ..ApplicationPatch::default()
        },
    )?;
    service.update_application(
        user,
        &globex.id,
        ApplicationPatch {
            status: Some(ApplicationStatus::Interview),
            response_date: Some(Some(days_ago(16))),
            ..ApplicationPatch::default()
        },
    )?;
    service.update_application(
        user,
        &hooli.id,
        ApplicationPatch {
            status: Some(ApplicationStatus::Rejected),
            response_date: Some(Some(days_ago(25))),
            ..ApplicationPatch::default()
        },
    )?;
    service.update_application(
        user,
        &umbrella.id,
        ApplicationPatch::status(ApplicationStatus::Ghosted),
    )?;

    service.create_interview(
        user,
        NewInterview {
            status: InterviewStatus::Completed,
            feedback: Some("Strong systems design, moving to offer".to_string()),
            ..NewInterview::new(acme.id.clone(), "Onsite", Some(at(days_ago(20), 14)))
        },
    )?;
    service.create_interview(
        user,
        NewInterview {
            prep_notes: Some("Review the service mesh rollout story".to_string()),
            ..NewInterview::new(globex.id.clone(), "Technical round", Some(at(days_ahead(1), 10)))
        },
    )?;
    service.create_interview(
        user,
        NewInterview::new(globex.id, "Hiring manager", Some(at(days_ahead(5), 16))),
    )?;

    debug!(user = %user, %today, "seeded demo job search");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn demo_report(today: NaiveDate) -> TrackerReport {
        let user = UserId::from("demo");
        let service = TrackerService::new(
            Arc::new(InMemoryTrackerRepository::default()),
            Arc::new(InMemoryResumeStorage::default()),
            TrackerConfig::default(),
        );
        seed_job_search(&service, &user, today).expect("demo seeds");
        build_report(&service, &user, DateRange::unbounded(), report_clock(Some(today)))
            .expect("report builds")
    }

    #[test]
    fn demo_history_produces_a_populated_report() {
        let report = demo_report(date(2026, 10, 18));
        let applications = &report.dashboard.applications;

        assert_eq!(applications.total, 5);
        assert_eq!(applications.count(ApplicationStatus::Offer), 1);
        assert_eq!(applications.count(ApplicationStatus::Interview), 1);
        assert_eq!(applications.response_rate, 40.0);
        assert_eq!(applications.success_rate, 20.0);

        assert_eq!(report.dashboard.referrals.total, 2);
        assert_eq!(report.dashboard.resumes.total_used, 4);
        assert_eq!(
            report
                .dashboard
                .resumes
                .top_resume
                .as_ref()
                .map(|top| top.version_name.as_str()),
            Some("Platform v1")
        );
        assert_eq!(report.dashboard.interviews.total, 3);
        assert_eq!(report.dashboard.interviews.upcoming, 2);

        assert_eq!(report.analytics.total_applications, 5);
        assert_eq!(report.analytics.funnel[3].count, 1);
        assert_eq!(report.analytics.time_metrics.offers_measured, 1);
        assert_eq!(report.analytics.time_metrics.avg_time_to_offer, 28.0);
        assert!(!report.recent_activity.is_empty());
    }

    #[test]
    fn demo_calendar_spreads_across_periods() {
        // 2026-10-18 is a Sunday, so the whole following week counts as this week.
        let report = demo_report(date(2026, 10, 18));
        let upcoming = &report.upcoming;

        assert_eq!(upcoming.overdue.len(), 1);
        assert_eq!(upcoming.today.len(), 1);
        assert_eq!(upcoming.today[0].title, "Follow up with Sam Ortiz");
        assert_eq!(upcoming.tomorrow.len(), 1);
        assert_eq!(upcoming.tomorrow[0].title, "Globex - Technical round");
        assert_eq!(upcoming.this_week.len(), 2);
        assert!(upcoming.later.is_empty());
    }

    #[test]
    fn snapshot_files_load_and_report_errors() {
        let dir = std::env::temp_dir().join(format!("applyflow-demo-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");

        let valid = dir.join("tracker.json");
        let mut file = std::fs::File::create(&valid).expect("create snapshot");
        file.write_all(
            br#"{"applications":[{"id":"app-1","company_name":"Acme","role":"SRE","status":"Applied","applied_date":"2026-10-01"}]}"#,
        )
        .expect("write snapshot");
        let snapshot = load_snapshot(&valid).expect("snapshot loads");
        assert_eq!(snapshot.applications.len(), 1);
        assert!(snapshot.referrals.is_empty());

        let invalid = dir.join("broken.json");
        std::fs::write(&invalid, "{\"applications\": [").expect("write snapshot");
        assert!(matches!(load_snapshot(&invalid), Err(AppError::Snapshot(_))));

        let missing = dir.join("missing.json");
        assert!(matches!(load_snapshot(&missing), Err(AppError::Io(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
