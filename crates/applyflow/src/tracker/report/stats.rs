use super::super::domain::{ApplicationStatus, InterviewStatus, ReferralStatus};
use super::super::records::{Application, Interview, Referral, Resume};
use super::percentage;
use super::views::{
    ApplicationStats, BoardColumn, DashboardStats, InterviewStats, ReferralStats, ResumeStats,
    StatusCount, TopResume,
};
use chrono::NaiveDateTime;

/// Counts `statuses` against every variant in `all`, keeping the declared order.
fn tally<S>(
    all: &[S],
    label: fn(S) -> &'static str,
    statuses: impl Iterator<Item = S>,
) -> Vec<StatusCount<S>>
where
    S: Copy + PartialEq,
{
    let mut counts: Vec<StatusCount<S>> = all
        .iter()
        .map(|&status| StatusCount {
            status,
            label: label(status),
            count: 0,
        })
        .collect();

    for status in statuses {
        if let Some(entry) = counts.iter_mut().find(|entry| entry.status == status) {
            entry.count += 1;
        }
    }

    counts
}

pub fn application_stats(applications: &[Application]) -> ApplicationStats {
    let total = applications.len();
    let by_status = tally(
        ApplicationStatus::ALL,
        ApplicationStatus::label,
        applications.iter().map(|application| application.status),
    );
    let count = |status: ApplicationStatus| {
        by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    };
    let interviews = count(ApplicationStatus::Interview);
    let offers = count(ApplicationStatus::Offer);
    let active = applications
        .iter()
        .filter(|application| application.status.is_active())
        .count();

    ApplicationStats {
        total,
        active,
        response_rate: percentage(interviews + offers, total),
        success_rate: percentage(offers, total),
        by_status,
    }
}

pub fn referral_stats(referrals: &[Referral]) -> ReferralStats {
    ReferralStats {
        total: referrals.len(),
        by_status: tally(
            ReferralStatus::ALL,
            ReferralStatus::label,
            referrals.iter().map(|referral| referral.status),
        ),
    }
}

pub fn resume_stats(resumes: &[Resume]) -> ResumeStats {
    let total_used = resumes
        .iter()
        .map(|resume| u64::from(resume.times_used))
        .sum();
    let average_success_rate = if resumes.is_empty() {
        0.0
    } else {
        resumes.iter().map(|resume| resume.success_rate).sum::<f64>() / resumes.len() as f64
    };

    // Later resumes win ties.
    let top_resume = resumes
        .iter()
        .fold(None::<&Resume>, |best, resume| match best {
            Some(current) if current.success_rate > resume.success_rate => Some(current),
            _ => Some(resume),
        })
        .map(|resume| TopResume {
            id: resume.id.clone(),
            version_name: resume.version_name.clone(),
            success_rate: resume.success_rate,
        });

    ResumeStats {
        total: resumes.len(),
        total_used,
        average_success_rate,
        top_resume,
    }
}

/// `upcoming` counts scheduled interviews strictly after `now`.
pub fn interview_stats(interviews: &[Interview], now: NaiveDateTime) -> InterviewStats {
    let upcoming = interviews
        .iter()
        .filter(|interview| interview.status == InterviewStatus::Scheduled)
        .filter(|interview| interview.scheduled_at.is_some_and(|at| at > now))
        .count();

    InterviewStats {
        total: interviews.len(),
        by_status: tally(
            InterviewStatus::ALL,
            InterviewStatus::label,
            interviews.iter().map(|interview| interview.status),
        ),
        upcoming,
    }
}

pub fn dashboard_stats(
    applications: &[Application],
    referrals: &[Referral],
    resumes: &[Resume],
    interviews: &[Interview],
    now: NaiveDateTime,
) -> DashboardStats {
    DashboardStats {
        applications: application_stats(applications),
        referrals: referral_stats(referrals),
        resumes: resume_stats(resumes),
        interviews: interview_stats(interviews, now),
    }
}

/// Groups applications into one column per status, in pipeline order.
pub fn status_board(applications: &[Application]) -> Vec<BoardColumn> {
    ApplicationStatus::ALL
        .iter()
        .map(|&status| BoardColumn {
            status,
            label: status.label(),
            applications: applications
                .iter()
                .filter(|application| application.status == status)
                .cloned()
                .collect(),
        })
        .collect()
}
