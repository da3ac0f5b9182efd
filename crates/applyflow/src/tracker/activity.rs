use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ActivityAction, ActivityId, ActivityType, ApplicationStatus, UserId};
use super::records::{ActivityLogEntry, Application, Interview, Referral, Resume};

/// A mutation worth recording in the user's activity log.
#[derive(Debug, Clone, Copy)]
pub enum Activity<'a> {
    ApplicationCreated(&'a Application),
    ApplicationUpdated {
        application: &'a Application,
        changes: &'a [&'static str],
    },
    ApplicationStatusChanged {
        application: &'a Application,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    ApplicationDeleted(&'a Application),
    ReferralCreated(&'a Referral),
    ReferralUpdated {
        referral: &'a Referral,
        changes: &'a [&'static str],
    },
    ReferralDeleted(&'a Referral),
    ResumeUploaded(&'a Resume),
    ResumeUpdated {
        resume: &'a Resume,
        changes: &'a [&'static str],
    },
    ResumeDeleted(&'a Resume),
    InterviewScheduled {
        interview: &'a Interview,
        company: &'a str,
    },
    InterviewUpdated {
        interview: &'a Interview,
        company: &'a str,
        changes: &'a [&'static str],
    },
    InterviewDeleted {
        interview: &'a Interview,
        company: &'a str,
    },
}

impl Activity<'_> {
    pub fn kind(&self) -> ActivityType {
        match self {
            Self::ApplicationCreated(_)
            | Self::ApplicationUpdated { .. }
            | Self::ApplicationStatusChanged { .. }
            | Self::ApplicationDeleted(_) => ActivityType::Application,
            Self::ReferralCreated(_) | Self::ReferralUpdated { .. } | Self::ReferralDeleted(_) => {
                ActivityType::Referral
            }
            Self::ResumeUploaded(_) | Self::ResumeUpdated { .. } | Self::ResumeDeleted(_) => {
                ActivityType::Resume
            }
            Self::InterviewScheduled { .. }
            | Self::InterviewUpdated { .. }
            | Self::InterviewDeleted { .. } => ActivityType::Interview,
        }
    }

    pub fn action(&self) -> ActivityAction {
        match self {
            Self::ApplicationCreated(_)
            | Self::ReferralCreated(_)
            | Self::ResumeUploaded(_)
            | Self::InterviewScheduled { .. } => ActivityAction::Created,
            Self::ApplicationUpdated { .. }
            | Self::ReferralUpdated { .. }
            | Self::ResumeUpdated { .. }
            | Self::InterviewUpdated { .. } => ActivityAction::Updated,
            Self::ApplicationStatusChanged { .. } => ActivityAction::StatusChanged,
            Self::ApplicationDeleted(_)
            | Self::ReferralDeleted(_)
            | Self::ResumeDeleted(_)
            | Self::InterviewDeleted { .. } => ActivityAction::Deleted,
        }
    }

    fn entity_id(&self) -> String {
        match self {
            Self::ApplicationCreated(application)
            | Self::ApplicationDeleted(application)
            | Self::ApplicationUpdated { application, .. }
            | Self::ApplicationStatusChanged { application, .. } => application.id.to_string(),
            Self::ReferralCreated(referral)
            | Self::ReferralDeleted(referral)
            | Self::ReferralUpdated { referral, .. } => referral.id.to_string(),
            Self::ResumeUploaded(resume)
            | Self::ResumeDeleted(resume)
            | Self::ResumeUpdated { resume, .. } => resume.id.to_string(),
            Self::InterviewScheduled { interview, .. }
            | Self::InterviewUpdated { interview, .. }
            | Self::InterviewDeleted { interview, .. } => interview.id.to_string(),
        }
    }

    /// Company for applications and interviews, the contact for referrals and
    /// the version name for resumes.
    fn entity_name(&self) -> String {
        match self {
            Self::ApplicationCreated(application)
            | Self::ApplicationDeleted(application)
            | Self::ApplicationUpdated { application, .. }
            | Self::ApplicationStatusChanged { application, .. } => {
                application.company_name.clone()
            }
            Self::ReferralCreated(referral)
            | Self::ReferralDeleted(referral)
            | Self::ReferralUpdated { referral, .. } => referral.person_name.clone(),
            Self::ResumeUploaded(resume)
            | Self::ResumeDeleted(resume)
            | Self::ResumeUpdated { resume, .. } => resume.version_name.clone(),
            Self::InterviewScheduled { company, .. }
            | Self::InterviewUpdated { company, .. }
            | Self::InterviewDeleted { company, .. } => company.to_string(),
        }
    }

    fn description(&self) -> String {
        match self {
            Self::ApplicationCreated(application) => format!(
                "Applied for {} at {}",
                application.role, application.company_name
            ),
            Self::ApplicationUpdated { changes, .. } => {
                format!("Updated application: {}", changes.join(", "))
            }
            Self::ApplicationStatusChanged { from, to, .. } => {
                format!("Status changed from {from} to {to}")
            }
            Self::ApplicationDeleted(application) => format!(
                "Deleted application for {} at {}",
                application.role, application.company_name
            ),
            Self::ReferralCreated(referral) => format!(
                "Added referral from {} at {}",
                referral.person_name, referral.company
            ),
            Self::ReferralUpdated { changes, .. } => {
                format!("Updated referral: {}", changes.join(", "))
            }
            Self::ReferralDeleted(referral) => format!(
                "Deleted referral from {} at {}",
                referral.person_name, referral.company
            ),
            Self::ResumeUploaded(resume) => format!("Uploaded resume: {}", resume.version_name),
            Self::ResumeUpdated { changes, .. } => {
                format!("Updated resume: {}", changes.join(", "))
            }
            Self::ResumeDeleted(resume) => format!("Deleted resume: {}", resume.version_name),
            Self::InterviewScheduled { interview, company } => format!(
                "Scheduled {} interview at {company}",
                interview.round_name
            ),
            Self::InterviewUpdated { changes, .. } => {
                format!("Updated interview: {}", changes.join(", "))
            }
            Self::InterviewDeleted { interview, company } => {
                format!("Deleted {} interview at {company}", interview.round_name)
            }
        }
    }

    pub fn into_entry(self, id: ActivityId, user_id: UserId, now: DateTime<Utc>) -> ActivityLogEntry {
        let (old_value, new_value) = match self {
            Self::ApplicationStatusChanged { from, to, .. } => {
                (Some(from.label().to_string()), Some(to.label().to_string()))
            }
            _ => (None, None),
        };

        ActivityLogEntry {
            id,
            user_id,
            activity_type: self.kind(),
            action: self.action(),
            entity_id: self.entity_id(),
            entity_name: self.entity_name(),
            description: self.description(),
            old_value,
            new_value,
            created_at: now,
        }
    }
}

/// One line of the dashboard's recent activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub action: ActivityAction,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityLogEntry> for ActivityItem {
    fn from(entry: ActivityLogEntry) -> Self {
        let title = feed_title(entry.activity_type, entry.action, &entry.entity_name);
        Self {
            id: entry.id,
            kind: entry.activity_type,
            action: entry.action,
            title,
            description: entry.description,
            timestamp: entry.created_at,
        }
    }
}

pub fn feed_title(kind: ActivityType, action: ActivityAction, name: &str) -> String {
    use ActivityAction::{Created, Deleted, StatusChanged, Updated};

    match (kind, action) {
        (ActivityType::Application, Created) => format!("Application to {name}"),
        (ActivityType::Application, StatusChanged) => format!("Status changed: {name}"),
        (ActivityType::Referral, Created) => format!("Referral from {name}"),
        (ActivityType::Resume, Created) => format!("Resume uploaded: {name}"),
        (ActivityType::Interview, Created) => format!("Interview at {name}"),
        (kind, Updated | StatusChanged) => format!("Updated {kind}: {name}"),
        (kind, Deleted) => format!("Deleted {kind}: {name}"),
    }
}
