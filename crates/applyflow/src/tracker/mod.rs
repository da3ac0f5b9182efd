//! Job application tracking: records, persistence seams, the tracker service
//! and its HTTP surface, plus the report aggregators behind the dashboard,
//! calendar and analytics pages.

pub mod activity;
pub mod domain;
pub mod query;
pub mod records;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use activity::{Activity, ActivityItem};
pub use domain::{
    ActivityAction, ActivityId, ActivityType, ApplicationId, ApplicationSource, ApplicationStatus,
    CompanyTier, DateRange, InterviewId, InterviewStatus, Priority, ReferralId, ReferralStatus,
    ResumeId, UnknownVariant, UserId,
};
pub use query::{ApplicationQuery, ApplicationSort};
pub use records::{
    parse_datetime, ActivityLogEntry, Application, ApplicationDetails, ApplicationPatch, Interview,
    InterviewPatch, NewApplication, NewInterview, NewReferral, PreferencesPatch, Referral,
    ReferralPatch, Resume, ResumePatch, ResumeUpload, UserPreferences,
};
pub use repository::{
    ActivityStore, ApplicationStore, InterviewStore, PreferenceStore, ReferralStore,
    RepositoryError, ResumeStorage, ResumeStore, StorageError, TrackerRepository,
};
pub use router::{tracker_router, USER_HEADER};
pub use service::{storage_key, TrackerService, TrackerServiceError};
