use std::collections::BTreeMap;

use super::super::domain::{ApplicationStatus, CompanyTier, DateRange};
use super::super::records::{Application, Resume};
use super::percentage;
use super::views::{
    AnalyticsReport, Channel, ChannelAnalytics, CompanyMetrics, DayAnalytics, FunnelStage,
    MonthlyTrend, ResumeAnalytics, TierAnalytics, TimeMetrics,
};
use chrono::{Datelike, NaiveDate};

const NO_RESUME: &str = "No Resume";
const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
/// Companies need this many applications before their success rate is ranked.
const MIN_COMPANY_APPLICATIONS: usize = 2;

fn responses(applications: &[&Application]) -> usize {
    applications
        .iter()
        .filter(|application| application.status.is_response())
        .count()
}

fn offers(applications: &[&Application]) -> usize {
    applications
        .iter()
        .filter(|application| application.status == ApplicationStatus::Offer)
        .count()
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
    }
}

/// Groups by a key while keeping first-seen order.
fn group_by<'a, K: PartialEq>(
    applications: &'a [Application],
    key: impl Fn(&Application) -> K,
) -> Vec<(K, Vec<&'a Application>)> {
    let mut groups: Vec<(K, Vec<&Application>)> = Vec::new();
    for application in applications {
        let k = key(application);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(application),
            None => groups.push((k, vec![application])),
        }
    }
    groups
}

/// Response rate per resume version, best first. Applications without a
/// resume form their own "No Resume" group.
pub fn resume_analytics(applications: &[Application], resumes: &[Resume]) -> Vec<ResumeAnalytics> {
    let mut rows: Vec<ResumeAnalytics> = group_by(applications, |application| {
        application.resume_id.clone()
    })
    .into_iter()
    .map(|(resume_id, members)| {
        let resume_name = resume_id
            .as_ref()
            .and_then(|id| resumes.iter().find(|resume| &resume.id == id))
            .map_or_else(|| NO_RESUME.to_string(), |resume| resume.version_name.clone());
        let responded = responses(&members);
        ResumeAnalytics {
            resume_id,
            resume_name,
            total_applications: members.len(),
            responses: responded,
            response_rate: percentage(responded, members.len()),
        }
    })
    .collect();

    rows.sort_by(|a, b| b.response_rate.total_cmp(&a.response_rate));
    rows
}

pub fn tier_analytics(applications: &[Application]) -> Vec<TierAnalytics> {
    let mut rows: Vec<TierAnalytics> = CompanyTier::ALL
        .iter()
        .filter_map(|&tier| {
            let members: Vec<&Application> = applications
                .iter()
                .filter(|application| application.tier() == tier)
                .collect();
            if members.is_empty() {
                return None;
            }
            let offered = offers(&members);
            Some(TierAnalytics {
                tier,
                total_applications: members.len(),
                offers: offered,
                success_rate: percentage(offered, members.len()),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    rows
}

/// Always two rows, referral first.
pub fn channel_analytics(applications: &[Application]) -> Vec<ChannelAnalytics> {
    [Channel::Referral, Channel::Direct]
        .into_iter()
        .map(|channel| {
            let members: Vec<&Application> = applications
                .iter()
                .filter(|application| application.is_referred() == (channel == Channel::Referral))
                .collect();
            let responded = responses(&members);
            ChannelAnalytics {
                channel,
                total_applications: members.len(),
                responses: responded,
                response_rate: percentage(responded, members.len()),
            }
        })
        .collect()
}

/// Mean whole days from applying to response and to offer. Records missing the
/// relevant date are left out of both sum and count.
pub fn time_metrics(applications: &[Application]) -> TimeMetrics {
    let response_days: Vec<i64> = applications
        .iter()
        .filter_map(Application::days_to_response)
        .collect();
    let offer_days: Vec<i64> = applications
        .iter()
        .filter_map(Application::days_to_offer)
        .collect();

    TimeMetrics {
        avg_time_to_response: mean(&response_days).unwrap_or(0.0),
        avg_time_to_offer: mean(&offer_days).unwrap_or(0.0),
        responses_measured: response_days.len(),
        offers_measured: offer_days.len(),
    }
}

/// Cumulative funnel: each stage counts applications that reached it or beyond.
pub fn funnel(applications: &[Application]) -> Vec<FunnelStage> {
    use ApplicationStatus::{Applied, Interview, Offer, OnlineAssessment};

    let total = applications.len();
    let reached = |stages: &[ApplicationStatus]| {
        applications
            .iter()
            .filter(|application| stages.contains(&application.status))
            .count()
    };

    [
        (Applied, total),
        (OnlineAssessment, reached(&[OnlineAssessment, Interview, Offer])),
        (Interview, reached(&[Interview, Offer])),
        (Offer, reached(&[Offer])),
    ]
    .into_iter()
    .map(|(stage, count)| FunnelStage {
        stage,
        count,
        percentage: percentage(count, total),
    })
    .collect()
}

/// Seven rows, Sunday through Saturday, by the weekday of `applied_date`.
pub fn weekday_analytics(applications: &[Application]) -> Vec<DayAnalytics> {
    WEEKDAYS
        .iter()
        .enumerate()
        .map(|(index, &day)| {
            let members: Vec<&Application> = applications
                .iter()
                .filter(|application| {
                    application.applied_date.weekday().num_days_from_sunday() as usize == index
                })
                .collect();
            let responded = responses(&members);
            DayAnalytics {
                day,
                applications: members.len(),
                responses: responded,
                response_rate: percentage(responded, members.len()),
            }
        })
        .collect()
}

fn company_metrics(applications: &[Application]) -> Vec<CompanyMetrics> {
    group_by(applications, |application| application.company_name.clone())
        .into_iter()
        .map(|(company_name, members)| {
            let response_days: Vec<i64> = members
                .iter()
                .filter_map(|application| application.days_to_response())
                .collect();
            let offered = offers(&members);
            CompanyMetrics {
                company_name,
                total_applications: members.len(),
                responses: response_days.len(),
                avg_response_days: mean(&response_days),
                offers: offered,
                success_rate: percentage(offered, members.len()),
            }
        })
        .collect()
}

/// Companies ordered by how quickly they answered, fastest first. Companies
/// that never responded have no average and are left out.
pub fn fastest_companies(applications: &[Application], limit: usize) -> Vec<CompanyMetrics> {
    let mut rows: Vec<CompanyMetrics> = company_metrics(applications)
        .into_iter()
        .filter(|row| row.avg_response_days.is_some())
        .collect();
    rows.sort_by(|a, b| {
        let a = a.avg_response_days.unwrap_or(f64::MAX);
        let b = b.avg_response_days.unwrap_or(f64::MAX);
        a.total_cmp(&b)
    });
    rows.truncate(limit);
    rows
}

pub fn company_success_rates(applications: &[Application], limit: usize) -> Vec<CompanyMetrics> {
    let mut rows: Vec<CompanyMetrics> = company_metrics(applications)
        .into_iter()
        .filter(|row| row.total_applications >= MIN_COMPANY_APPLICATIONS)
        .collect();
    rows.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    rows.truncate(limit);
    rows
}

/// Applications and offers per calendar month, oldest month first.
pub fn monthly_trend(applications: &[Application]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<(i32, u32), (usize, usize)> = BTreeMap::new();
    for application in applications {
        let date = application.applied_date;
        let entry = months.entry((date.year(), date.month())).or_default();
        entry.0 += 1;
        if application.status == ApplicationStatus::Offer {
            entry.1 += 1;
        }
    }

    months
        .into_iter()
        .filter_map(|((year, month), (applied, offered))| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthlyTrend {
                year,
                month,
                label: first.format("%b %Y").to_string(),
                applications: applied,
                offers: offered,
            })
        })
        .collect()
}

/// Runs every trend over the applications applied within `range`.
pub fn analytics_report(
    applications: &[Application],
    resumes: &[Resume],
    range: DateRange,
    company_limit: usize,
) -> AnalyticsReport {
    let scoped: Vec<Application> = applications
        .iter()
        .filter(|application| range.contains(application.applied_date))
        .cloned()
        .collect();

    AnalyticsReport {
        range,
        total_applications: scoped.len(),
        by_resume: resume_analytics(&scoped, resumes),
        by_tier: tier_analytics(&scoped),
        referral_vs_direct: channel_analytics(&scoped),
        time_metrics: time_metrics(&scoped),
        funnel: funnel(&scoped),
        by_weekday: weekday_analytics(&scoped),
        fastest_companies: fastest_companies(&scoped, company_limit),
        company_success: company_success_rates(&scoped, company_limit),
        monthly_trend: monthly_trend(&scoped),
    }
}
