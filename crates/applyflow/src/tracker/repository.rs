use mime::Mime;

use super::domain::{ApplicationId, DateRange, InterviewId, ReferralId, ResumeId, UserId};
use super::records::{ActivityLogEntry, Application, Interview, Referral, Resume, UserPreferences};

/// Application rows. Listings are newest `applied_date` first and filtered by the
/// inclusive range on `applied_date`.
pub trait ApplicationStore: Send + Sync {
    fn applications(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn insert_application(&self, record: Application) -> Result<Application, RepositoryError>;
    fn update_application(&self, record: Application) -> Result<(), RepositoryError>;
    /// Returns `false` when nothing matched.
    fn delete_application(&self, user: &UserId, id: &ApplicationId)
        -> Result<bool, RepositoryError>;
}

pub trait ReferralStore: Send + Sync {
    fn referrals(&self, user: &UserId) -> Result<Vec<Referral>, RepositoryError>;
    fn referral(&self, user: &UserId, id: &ReferralId)
        -> Result<Option<Referral>, RepositoryError>;
    fn insert_referral(&self, record: Referral) -> Result<Referral, RepositoryError>;
    fn update_referral(&self, record: Referral) -> Result<(), RepositoryError>;
    fn delete_referral(&self, user: &UserId, id: &ReferralId) -> Result<bool, RepositoryError>;
}

pub trait ResumeStore: Send + Sync {
    fn resumes(&self, user: &UserId) -> Result<Vec<Resume>, RepositoryError>;
    fn resume(&self, user: &UserId, id: &ResumeId) -> Result<Option<Resume>, RepositoryError>;
    fn insert_resume(&self, record: Resume) -> Result<Resume, RepositoryError>;
    fn update_resume(&self, record: Resume) -> Result<(), RepositoryError>;
    fn delete_resume(&self, user: &UserId, id: &ResumeId) -> Result<bool, RepositoryError>;
}

/// Interview rows. A bounded range keeps only interviews scheduled inside it;
/// the unbounded range returns every interview, scheduled or not.
pub trait InterviewStore: Send + Sync {
    fn interviews(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Interview>, RepositoryError>;
    fn interview(
        &self,
        user: &UserId,
        id: &InterviewId,
    ) -> Result<Option<Interview>, RepositoryError>;
    fn insert_interview(&self, record: Interview) -> Result<Interview, RepositoryError>;
    fn update_interview(&self, record: Interview) -> Result<(), RepositoryError>;
    fn delete_interview(&self, user: &UserId, id: &InterviewId) -> Result<bool, RepositoryError>;
}

pub trait PreferenceStore: Send + Sync {
    fn preferences(&self, user: &UserId) -> Result<Option<UserPreferences>, RepositoryError>;
    fn save_preferences(&self, record: UserPreferences) -> Result<(), RepositoryError>;
}

/// Append-only activity log.
pub trait ActivityStore: Send + Sync {
    fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError>;
    /// Newest first, at most `limit` entries.
    fn recent_activity(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError>;
}

/// Everything the tracker service reads and writes, usually one hosted database.
pub trait TrackerRepository:
    ApplicationStore + ReferralStore + ResumeStore + InterviewStore + PreferenceStore + ActivityStore
{
}

impl<T> TrackerRepository for T where
    T: ApplicationStore
        + ReferralStore
        + ResumeStore
        + InterviewStore
        + PreferenceStore
        + ActivityStore
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Object storage holding resume files.
pub trait ResumeStorage: Send + Sync {
    /// Stores the object and returns its URL.
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &Mime,
    ) -> Result<String, StorageError>;
    fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
    fn remove(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("object '{0}' already exists")]
    AlreadyExists(String),
    #[error("storage transport unavailable: {0}")]
    Transport(String),
}
