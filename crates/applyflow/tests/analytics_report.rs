//! Analytics and dashboard aggregation over a small, hand-checked history.
//!
//! Records are built from JSON the way a stored snapshot would arrive, so the
//! scenarios only touch the public record types and report functions.

use applyflow::tracker::report::{analytics_report, dashboard_stats, status_board};
use applyflow::tracker::{Application, ApplicationStatus, CompanyTier, DateRange, Resume};
use chrono::NaiveDate;
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn applications() -> Vec<Application> {
    serde_json::from_value(json!([
        {
            "id": "app-1", "company_name": "Acme", "role": "Backend Engineer",
            "status": "Offer", "applied_date": "2026-09-01",
            "response_date": "2026-09-08", "offer_date": "2026-09-20",
            "company_tier": "FAANG", "resume_id": "res-1", "referral_id": "ref-1"
        },
        {
            "id": "app-2", "company_name": "Acme", "role": "Platform Engineer",
            "status": "Rejected", "applied_date": "2026-09-03",
            "response_date": "2026-09-05", "company_tier": "FAANG", "resume_id": "res-1"
        },
        {
            "id": "app-3", "company_name": "Globex", "role": "SRE",
            "status": "Interview", "applied_date": "2026-10-05",
            "response_date": "2026-10-09", "company_tier": "Startup",
            "resume_id": "res-2", "referral_id": "ref-1"
        },
        {
            "id": "app-4", "company_name": "Initech", "role": "Data Engineer",
            "status": "Applied", "applied_date": "2026-10-06"
        },
        {
            "id": "app-5", "company_name": "Initech", "role": "ML Engineer",
            "status": "Ghosted", "applied_date": "2026-10-07"
        }
    ]))
    .expect("applications parse")
}

fn resumes() -> Vec<Resume> {
    serde_json::from_value(json!([
        {
            "id": "res-1", "version_name": "Backend v1",
            "file_url": "user-1/1_backend.pdf", "upload_date": "2026-08-20",
            "times_used": 2, "success_rate": 50.0
        },
        {
            "id": "res-2", "version_name": "SRE v1",
            "file_url": "user-1/2_sre.pdf", "upload_date": "2026-09-15",
            "times_used": 1, "success_rate": 80.0
        }
    ]))
    .expect("resumes parse")
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn full_history_report_matches_hand_computed_figures() {
    let report = analytics_report(&applications(), &resumes(), DateRange::unbounded(), 10);

    assert_eq!(report.total_applications, 5);

    let by_resume: Vec<(&str, usize, f64)> = report
        .by_resume
        .iter()
        .map(|row| (row.resume_name.as_str(), row.total_applications, row.response_rate))
        .collect();
    assert_eq!(
        by_resume,
        vec![("Backend v1", 2, 100.0), ("SRE v1", 1, 100.0), ("No Resume", 2, 0.0)]
    );

    let tiers: Vec<(CompanyTier, usize, f64)> = report
        .by_tier
        .iter()
        .map(|row| (row.tier, row.total_applications, row.success_rate))
        .collect();
    assert_eq!(
        tiers,
        vec![
            (CompanyTier::Faang, 2, 50.0),
            (CompanyTier::Startup, 1, 0.0),
            (CompanyTier::Unknown, 2, 0.0),
        ]
    );

    let referral = &report.referral_vs_direct[0];
    let direct = &report.referral_vs_direct[1];
    assert_eq!(referral.total_applications, 2);
    assert_eq!(referral.response_rate, 100.0);
    assert_eq!(direct.total_applications, 3);
    assert!(close(direct.response_rate, 100.0 / 3.0));

    assert!(close(report.time_metrics.avg_time_to_response, 13.0 / 3.0));
    assert_eq!(report.time_metrics.avg_time_to_offer, 19.0);
    assert_eq!(report.time_metrics.responses_measured, 3);
    assert_eq!(report.time_metrics.offers_measured, 1);

    let funnel: Vec<(ApplicationStatus, usize)> = report
        .funnel
        .iter()
        .map(|stage| (stage.stage, stage.count))
        .collect();
    assert_eq!(
        funnel,
        vec![
            (ApplicationStatus::Applied, 5),
            (ApplicationStatus::OnlineAssessment, 2),
            (ApplicationStatus::Interview, 2),
            (ApplicationStatus::Offer, 1),
        ]
    );
    assert_eq!(report.funnel[3].percentage, 20.0);
}

#[test]
fn weekday_rows_run_sunday_through_saturday() {
    let report = analytics_report(&applications(), &resumes(), DateRange::unbounded(), 10);

    let days: Vec<&str> = report.by_weekday.iter().map(|row| row.day).collect();
    assert_eq!(
        days,
        vec!["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
    );
    let tuesday = &report.by_weekday[2];
    assert_eq!(tuesday.applications, 2);
    assert_eq!(tuesday.responses, 1);
    assert_eq!(tuesday.response_rate, 50.0);
    assert_eq!(report.by_weekday[0].applications, 0);
    assert_eq!(report.by_weekday[0].response_rate, 0.0);
}

#[test]
fn company_rankings_skip_silent_and_single_application_companies() {
    let report = analytics_report(&applications(), &resumes(), DateRange::unbounded(), 10);

    let fastest: Vec<(&str, Option<f64>)> = report
        .fastest_companies
        .iter()
        .map(|row| (row.company_name.as_str(), row.avg_response_days))
        .collect();
    assert_eq!(fastest, vec![("Globex", Some(4.0)), ("Acme", Some(4.5))]);

    let success: Vec<(&str, f64)> = report
        .company_success
        .iter()
        .map(|row| (row.company_name.as_str(), row.success_rate))
        .collect();
    assert_eq!(success, vec![("Acme", 50.0), ("Initech", 0.0)]);

    let limited = analytics_report(&applications(), &resumes(), DateRange::unbounded(), 1);
    assert_eq!(limited.fastest_companies.len(), 1);
    assert_eq!(limited.company_success.len(), 1);
}

#[test]
fn monthly_trend_is_oldest_first() {
    let report = analytics_report(&applications(), &resumes(), DateRange::unbounded(), 10);

    let months: Vec<(&str, usize, usize)> = report
        .monthly_trend
        .iter()
        .map(|row| (row.label.as_str(), row.applications, row.offers))
        .collect();
    assert_eq!(months, vec![("Sep 2026", 2, 1), ("Oct 2026", 3, 0)]);
}

#[test]
fn range_filter_applies_before_every_aggregate() {
    let october = DateRange::between(date(2026, 10, 1), date(2026, 10, 31));
    let report = analytics_report(&applications(), &resumes(), october, 10);

    assert_eq!(report.total_applications, 3);
    assert_eq!(report.funnel[0].count, 3);
    assert_eq!(report.monthly_trend.len(), 1);
    assert!(report
        .by_tier
        .iter()
        .all(|row| row.tier != CompanyTier::Faang));
    assert_eq!(report.time_metrics.offers_measured, 0);
    assert_eq!(report.time_metrics.avg_time_to_offer, 0.0);
}

#[test]
fn empty_history_yields_zeroed_report() {
    let report = analytics_report(&[], &[], DateRange::unbounded(), 10);

    assert_eq!(report.total_applications, 0);
    assert!(report.by_resume.is_empty());
    assert!(report.by_tier.is_empty());
    assert_eq!(report.referral_vs_direct.len(), 2);
    assert!(report.funnel.iter().all(|stage| stage.percentage == 0.0));
    assert_eq!(report.by_weekday.len(), 7);
    assert!(report.monthly_trend.is_empty());
}

#[test]
fn dashboard_counts_agree_with_the_board() {
    let applications = applications();
    let now = date(2026, 10, 18).and_hms_opt(9, 0, 0).expect("valid time");
    let stats = dashboard_stats(&applications, &[], &resumes(), &[], now);

    assert_eq!(stats.applications.total, 5);
    assert_eq!(stats.applications.active, 3);
    assert_eq!(stats.applications.response_rate, 40.0);
    assert_eq!(stats.applications.success_rate, 20.0);
    let summed: usize = stats.applications.by_status.iter().map(|entry| entry.count).sum();
    assert_eq!(summed, stats.applications.total);

    assert_eq!(stats.resumes.total_used, 3);
    assert_eq!(stats.resumes.average_success_rate, 65.0);
    let top = stats.resumes.top_resume.expect("top resume");
    assert_eq!(top.version_name, "SRE v1");

    let board = status_board(&applications);
    for column in &board {
        assert_eq!(
            column.applications.len(),
            stats.applications.count(column.status),
            "column {} disagrees with the status counts",
            column.label
        );
    }
}
