use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use mime::Mime;
use serde_json::Value;

use crate::config::TrackerConfig;
use crate::tracker::domain::{
    ApplicationId, DateRange, InterviewId, ReferralId, ResumeId, UserId,
};
use crate::tracker::records::{
    ActivityLogEntry, Application, Interview, NewApplication, Referral, Resume, ResumeUpload,
    UserPreferences,
};
use crate::tracker::repository::{
    ActivityStore, ApplicationStore, InterviewStore, PreferenceStore, ReferralStore,
    RepositoryError, ResumeStorage, ResumeStore, StorageError,
};
use crate::tracker::{tracker_router, TrackerService};

pub(super) type MemoryService = TrackerService<MemoryRepository, MemoryStorage>;

pub(super) fn user() -> UserId {
    UserId::from("user-1")
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hour, 0, 0).expect("valid time")
}

pub(super) fn submission(company: &str, role: &str, applied: NaiveDate) -> NewApplication {
    NewApplication::new(company, role, applied)
}

pub(super) fn pdf_upload(version: &str) -> ResumeUpload {
    ResumeUpload {
        version_name: version.to_string(),
        file_name: "Backend CV.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7 resume body".to_vec(),
    }
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryRepository>, Arc<MemoryStorage>) {
    build_service_with(TrackerConfig::default())
}

pub(super) fn build_service_with(
    config: TrackerConfig,
) -> (MemoryService, Arc<MemoryRepository>, Arc<MemoryStorage>) {
    let repository = Arc::new(MemoryRepository::default());
    let storage = Arc::new(MemoryStorage::default());
    let service = TrackerService::new(repository.clone(), storage.clone(), config);
    (service, repository, storage)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    tracker_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
struct Tables {
    applications: HashMap<ApplicationId, Application>,
    referrals: HashMap<ReferralId, Referral>,
    resumes: HashMap<ResumeId, Resume>,
    interviews: HashMap<InterviewId, Interview>,
    preferences: HashMap<UserId, UserPreferences>,
    activity: Vec<ActivityLogEntry>,
}

/// Single-process stand-in for the hosted database.
#[derive(Default)]
pub(super) struct MemoryRepository {
    tables: Mutex<Tables>,
    offline: AtomicBool,
    reject_activity: AtomicBool,
}

impl MemoryRepository {
    /// Every call fails with `Unavailable` from now on.
    pub(super) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(super) fn reject_activity(&self) {
        self.reject_activity.store(true, Ordering::SeqCst);
    }

    pub(super) fn activity(&self) -> Vec<ActivityLogEntry> {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .activity
            .clone()
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        Ok(self.tables.lock().expect("repository mutex poisoned"))
    }
}

impl ApplicationStore for MemoryRepository {
    fn applications(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<Application> = tables
            .applications
            .values()
            .filter(|row| &row.user_id == user && range.contains(row.applied_date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.applied_date
                .cmp(&a.applied_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }

    fn application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .applications
            .get(id)
            .filter(|row| &row.user_id == user)
            .cloned())
    }

    fn insert_application(&self, record: Application) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.applications.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.applications.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_application(&self, record: Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.applications.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let owned = tables
            .applications
            .get(id)
            .is_some_and(|row| &row.user_id == user);
        Ok(owned && tables.applications.remove(id).is_some())
    }
}

impl ReferralStore for MemoryRepository {
    fn referrals(&self, user: &UserId) -> Result<Vec<Referral>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<Referral> = tables
            .referrals
            .values()
            .filter(|row| &row.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn referral(&self, user: &UserId, id: &ReferralId) -> Result<Option<Referral>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .referrals
            .get(id)
            .filter(|row| &row.user_id == user)
            .cloned())
    }

    fn insert_referral(&self, record: Referral) -> Result<Referral, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.referrals.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.referrals.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_referral(&self, record: Referral) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.referrals.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_referral(&self, user: &UserId, id: &ReferralId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let owned = tables
            .referrals
            .get(id)
            .is_some_and(|row| &row.user_id == user);
        Ok(owned && tables.referrals.remove(id).is_some())
    }
}

impl ResumeStore for MemoryRepository {
    fn resumes(&self, user: &UserId) -> Result<Vec<Resume>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|row| &row.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn resume(&self, user: &UserId, id: &ResumeId) -> Result<Option<Resume>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .resumes
            .get(id)
            .filter(|row| &row.user_id == user)
            .cloned())
    }

    fn insert_resume(&self, record: Resume) -> Result<Resume, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.resumes.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.resumes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_resume(&self, record: Resume) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.resumes.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_resume(&self, user: &UserId, id: &ResumeId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let owned = tables
            .resumes
            .get(id)
            .is_some_and(|row| &row.user_id == user);
        Ok(owned && tables.resumes.remove(id).is_some())
    }
}

impl InterviewStore for MemoryRepository {
    fn interviews(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Interview>, RepositoryError> {
        let tables = self.tables()?;
        let bounded = *range != DateRange::unbounded();
        let mut rows: Vec<Interview> = tables
            .interviews
            .values()
            .filter(|row| &row.user_id == user)
            .filter(|row| {
                !bounded
                    || row
                        .scheduled_at
                        .is_some_and(|scheduled| range.contains(scheduled.date()))
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.scheduled_at, row.created_at));
        Ok(rows)
    }

    fn interview(
        &self,
        user: &UserId,
        id: &InterviewId,
    ) -> Result<Option<Interview>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .interviews
            .get(id)
            .filter(|row| &row.user_id == user)
            .cloned())
    }

    fn insert_interview(&self, record: Interview) -> Result<Interview, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.interviews.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.interviews.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_interview(&self, record: Interview) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.interviews.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_interview(&self, user: &UserId, id: &InterviewId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let owned = tables
            .interviews
            .get(id)
            .is_some_and(|row| &row.user_id == user);
        Ok(owned && tables.interviews.remove(id).is_some())
    }
}

impl PreferenceStore for MemoryRepository {
    fn preferences(&self, user: &UserId) -> Result<Option<UserPreferences>, RepositoryError> {
        Ok(self.tables()?.preferences.get(user).cloned())
    }

    fn save_preferences(&self, record: UserPreferences) -> Result<(), RepositoryError> {
        self.tables()?
            .preferences
            .insert(record.user_id.clone(), record);
        Ok(())
    }
}

impl ActivityStore for MemoryRepository {
    fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError> {
        if self.reject_activity.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("activity log offline".to_string()));
        }
        self.tables()?.activity.push(entry);
        Ok(())
    }

    fn recent_activity(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .activity
            .iter()
            .rev()
            .filter(|entry| &entry.user_id == user)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryStorage {
    objects: Mutex<HashMap<String, (Mime, Vec<u8>)>>,
}

impl MemoryStorage {
    pub(super) fn keys(&self) -> Vec<String> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ResumeStorage for MemoryStorage {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &Mime,
    ) -> Result<String, StorageError> {
        let path = format!("{bucket}/{key}");
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        if guard.contains_key(&path) {
            return Err(StorageError::AlreadyExists(path));
        }
        guard.insert(path.clone(), (content_type.clone(), bytes));
        Ok(format!("https://storage.test/object/public/{path}"))
    }

    fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = format!("{bucket}/{key}");
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .get(&path)
            .map(|(_, bytes)| bytes.clone())
            .ok_or(StorageError::NotFound(path))
    }

    fn remove(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = format!("{bucket}/{key}");
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .remove(&path)
            .map(|_| ())
            .ok_or(StorageError::NotFound(path))
    }
}
