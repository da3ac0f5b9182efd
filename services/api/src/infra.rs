use applyflow::tracker::{
    ActivityLogEntry, ActivityStore, Application, ApplicationId, ApplicationStore, DateRange,
    Interview, InterviewId, InterviewStore, PreferenceStore, Referral, ReferralId, ReferralStore,
    RepositoryError, Resume, ResumeId, ResumeStorage, ResumeStore, StorageError, UserId,
    UserPreferences,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Tracker records exported as one JSON document. Every list is optional.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrackerSnapshot {
    #[serde(default)]
    pub(crate) applications: Vec<Application>,
    #[serde(default)]
    pub(crate) referrals: Vec<Referral>,
    #[serde(default)]
    pub(crate) resumes: Vec<Resume>,
    #[serde(default)]
    pub(crate) interviews: Vec<Interview>,
}

#[derive(Default)]
struct TrackerTables {
    applications: BTreeMap<ApplicationId, Application>,
    referrals: BTreeMap<ReferralId, Referral>,
    resumes: BTreeMap<ResumeId, Resume>,
    interviews: BTreeMap<InterviewId, Interview>,
    preferences: BTreeMap<UserId, UserPreferences>,
    activity: Vec<ActivityLogEntry>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTrackerRepository {
    tables: Arc<Mutex<TrackerTables>>,
}

impl InMemoryTrackerRepository {
    /// Loads every snapshot record as belonging to `user`.
    pub(crate) fn from_snapshot(user: &UserId, snapshot: TrackerSnapshot) -> Self {
        let repository = Self::default();
        {
            let mut tables = repository.lock();
            for mut record in snapshot.applications {
                record.user_id = user.clone();
                tables.applications.insert(record.id.clone(), record);
            }
            for mut record in snapshot.referrals {
                record.user_id = user.clone();
                tables.referrals.insert(record.id.clone(), record);
            }
            for mut record in snapshot.resumes {
                record.user_id = user.clone();
                tables.resumes.insert(record.id.clone(), record);
            }
            for mut record in snapshot.interviews {
                record.user_id = user.clone();
                tables.interviews.insert(record.id.clone(), record);
            }
        }
        repository
    }

    fn lock(&self) -> MutexGuard<'_, TrackerTables> {
        self.tables.lock().expect("repository mutex poisoned")
    }
}

fn owned_by<'a, K: Ord, V>(
    table: &'a BTreeMap<K, V>,
    id: &K,
    owner: impl Fn(&V) -> &UserId,
    user: &UserId,
) -> Option<&'a V> {
    table.get(id).filter(|row| owner(row) == user)
}

fn remove_owned<K: Ord, V>(
    table: &mut BTreeMap<K, V>,
    id: &K,
    owner: impl Fn(&V) -> &UserId,
    user: &UserId,
) -> bool {
    if owned_by(table, id, owner, user).is_none() {
        return false;
    }
    table.remove(id).is_some()
}

fn replace<K: Ord, V>(table: &mut BTreeMap<K, V>, id: &K, record: V) -> Result<(), RepositoryError> {
    match table.get_mut(id) {
        Some(slot) => {
            *slot = record;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

impl ApplicationStore for InMemoryTrackerRepository {
    fn applications(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock();
        let mut rows: Vec<Application> = tables
            .applications
            .values()
            .filter(|row| &row.user_id == user && range.contains(row.applied_date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        Ok(rows)
    }

    fn application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.lock();
        Ok(owned_by(&tables.applications, id, |row| &row.user_id, user).cloned())
    }

    fn insert_application(&self, record: Application) -> Result<Application, RepositoryError> {
        let mut tables = self.lock();
        if tables.applications.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.applications.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_application(&self, record: Application) -> Result<(), RepositoryError> {
        let id = record.id.clone();
        replace(&mut self.lock().applications, &id, record)
    }

    fn delete_application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<bool, RepositoryError> {
        Ok(remove_owned(
            &mut self.lock().applications,
            id,
            |row| &row.user_id,
            user,
        ))
    }
}

impl ReferralStore for InMemoryTrackerRepository {
    fn referrals(&self, user: &UserId) -> Result<Vec<Referral>, RepositoryError> {
        let tables = self.lock();
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
        let tables = self.lock();
        Ok(owned_by(&tables.referrals, id, |row| &row.user_id, user).cloned())
    }

    fn insert_referral(&self, record: Referral) -> Result<Referral, RepositoryError> {
        let mut tables = self.lock();
        if tables.referrals.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.referrals.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_referral(&self, record: Referral) -> Result<(), RepositoryError> {
        let id = record.id.clone();
        replace(&mut self.lock().referrals, &id, record)
    }

    fn delete_referral(&self, user: &UserId, id: &ReferralId) -> Result<bool, RepositoryError> {
        Ok(remove_owned(
            &mut self.lock().referrals,
            id,
            |row| &row.user_id,
            user,
        ))
    }
}

impl ResumeStore for InMemoryTrackerRepository {
    fn resumes(&self, user: &UserId) -> Result<Vec<Resume>, RepositoryError> {
        let tables = self.lock();
        let mut rows: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|row| &row.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(rows)
    }

    fn resume(&self, user: &UserId, id: &ResumeId) -> Result<Option<Resume>, RepositoryError> {
        let tables = self.lock();
        Ok(owned_by(&tables.resumes, id, |row| &row.user_id, user).cloned())
    }

    fn insert_resume(&self, record: Resume) -> Result<Resume, RepositoryError> {
        let mut tables = self.lock();
        if tables.resumes.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.resumes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_resume(&self, record: Resume) -> Result<(), RepositoryError> {
        let id = record.id.clone();
        replace(&mut self.lock().resumes, &id, record)
    }

    fn delete_resume(&self, user: &UserId, id: &ResumeId) -> Result<bool, RepositoryError> {
        Ok(remove_owned(
            &mut self.lock().resumes,
            id,
            |row| &row.user_id,
            user,
        ))
    }
}

impl InterviewStore for InMemoryTrackerRepository {
    fn interviews(
        &self,
        user: &UserId,
        range: &DateRange,
    ) -> Result<Vec<Interview>, RepositoryError> {
        let tables = self.lock();
        let unbounded = *range == DateRange::unbounded();
        let mut rows: Vec<Interview> = tables
            .interviews
            .values()
            .filter(|row| &row.user_id == user)
            .filter(|row| {
                unbounded
                    || row
                        .scheduled_at
                        .is_some_and(|scheduled| range.contains(scheduled.date()))
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.scheduled_at);
        Ok(rows)
    }

    fn interview(
        &self,
        user: &UserId,
        id: &InterviewId,
    ) -> Result<Option<Interview>, RepositoryError> {
        let tables = self.lock();
        Ok(owned_by(&tables.interviews, id, |row| &row.user_id, user).cloned())
    }

    fn insert_interview(&self, record: Interview) -> Result<Interview, RepositoryError> {
        let mut tables = self.lock();
        if tables.interviews.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.interviews.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_interview(&self, record: Interview) -> Result<(), RepositoryError> {
        let id = record.id.clone();
        replace(&mut self.lock().interviews, &id, record)
    }

    fn delete_interview(&self, user: &UserId, id: &InterviewId) -> Result<bool, RepositoryError> {
        Ok(remove_owned(
            &mut self.lock().interviews,
            id,
            |row| &row.user_id,
            user,
        ))
    }
}

impl PreferenceStore for InMemoryTrackerRepository {
    fn preferences(&self, user: &UserId) -> Result<Option<UserPreferences>, RepositoryError> {
        Ok(self.lock().preferences.get(user).cloned())
    }

    fn save_preferences(&self, record: UserPreferences) -> Result<(), RepositoryError> {
        self.lock()
            .preferences
            .insert(record.user_id.clone(), record);
        Ok(())
    }
}

impl ActivityStore for InMemoryTrackerRepository {
    fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError> {
        self.lock().activity.push(entry);
        Ok(())
    }

    fn recent_activity(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        Ok(self
            .lock()
            .activity
            .iter()
            .rev()
            .filter(|entry| &entry.user_id == user)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Keeps uploaded resumes in process memory under `<bucket>/<key>`.
#[derive(Default, Clone)]
pub(crate) struct InMemoryResumeStorage {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryResumeStorage {
    fn path(bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }
}

impl ResumeStorage for InMemoryResumeStorage {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &mime::Mime,
    ) -> Result<String, StorageError> {
        let path = Self::path(bucket, key);
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        if guard.contains_key(&path) {
            return Err(StorageError::AlreadyExists(path));
        }
        guard.insert(path.clone(), bytes);
        Ok(format!("memory://{path}"))
    }

    fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = Self::path(bucket, key);
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard.get(&path).cloned().ok_or(StorageError::NotFound(path))
    }

    fn remove(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = Self::path(bucket, key);
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        match guard.remove(&path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path)),
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
