use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use mime::Mime;
use tracing::{debug, info, warn};

use super::activity::{Activity, ActivityItem};
use super::domain::{
    ActivityId, ApplicationId, DateRange, InterviewId, InterviewStatus, ReferralId, ResumeId,
    UserId,
};
use super::query::ApplicationQuery;
use super::records::{
    Application, ApplicationDetails, ApplicationPatch, Interview, InterviewPatch, NewApplication,
    NewInterview, NewReferral, PreferencesPatch, Referral, ReferralPatch, Resume, ResumePatch,
    ResumeUpload, UserPreferences,
};
use super::report::views::{
    AnalyticsReport, BoardColumn, CalendarEvent, DashboardStats, MonthGrid, PeriodBuckets,
    TodayItems,
};
use super::report::{self, calendar, trends};
use super::repository::{RepositoryError, ResumeStorage, StorageError, TrackerRepository};
use crate::config::TrackerConfig;

/// Service owning every tracker operation for a signed-in user.
///
/// Each call names the user explicitly; nothing is read from ambient session
/// state. Referential cleanup (clearing links, cascading interviews) happens
/// here because the repository traits only store rows.
pub struct TrackerService<R, S> {
    repository: Arc<R>,
    storage: Arc<S>,
    config: TrackerConfig,
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

fn required(value: &str, field: &'static str) -> Result<(), TrackerServiceError> {
    if value.trim().is_empty() {
        return Err(TrackerServiceError::Validation(format!(
            "{field} must not be blank"
        )));
    }
    Ok(())
}

fn not_found(entity: &'static str, id: impl fmt::Display) -> TrackerServiceError {
    TrackerServiceError::NotFound {
        entity,
        id: id.to_string(),
    }
}

/// Replaces anything outside `[A-Za-z0-9._-]` so the name is safe as a key segment.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object key for a stored resume. Accepts a full URL or a bare key.
pub fn storage_key<'a>(bucket: &str, file_url: &'a str) -> &'a str {
    let marker = format!("{bucket}/");
    file_url
        .find(&marker)
        .map_or(file_url, |index| &file_url[index + marker.len()..])
}

fn resume_content_type(upload: &ResumeUpload) -> Result<Mime, TrackerServiceError> {
    let content_type = match upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
    {
        Some(raw) => raw.parse::<Mime>().map_err(|_| {
            TrackerServiceError::Validation(format!("'{raw}' is not a valid content type"))
        })?,
        None => mime_guess::from_path(&upload.file_name).first_or_octet_stream(),
    };

    if content_type.type_() != mime::APPLICATION || content_type.subtype() != mime::PDF {
        return Err(TrackerServiceError::Validation(format!(
            "resumes must be PDF files, got {}",
            content_type.essence_str()
        )));
    }
    Ok(content_type)
}

impl<R, S> TrackerService<R, S>
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    pub fn new(repository: Arc<R>, storage: Arc<S>, config: TrackerConfig) -> Self {
        Self {
            repository,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Appends to the activity log. Failures are traced and never fail the caller.
    fn record(&self, user: &UserId, activity: Activity<'_>) {
        let entry = activity.into_entry(ActivityId(next_id("act")), user.clone(), Utc::now());
        if let Err(error) = self.repository.append_activity(entry) {
            warn!(
                user = %user,
                kind = %activity.kind(),
                action = %activity.action(),
                %error,
                "failed to record activity"
            );
        }
    }

    fn all_applications(&self, user: &UserId) -> Result<Vec<Application>, TrackerServiceError> {
        Ok(self.repository.applications(user, &DateRange::unbounded())?)
    }

    fn company_for(&self, user: &UserId, application: &ApplicationId) -> String {
        self.repository
            .application(user, application)
            .ok()
            .flatten()
            .map_or_else(|| "Unknown Company".to_string(), |found| found.company_name)
    }

    fn ensure_links(
        &self,
        user: &UserId,
        resume: Option<&ResumeId>,
        referral: Option<&ReferralId>,
    ) -> Result<(), TrackerServiceError> {
        if let Some(id) = resume {
            if self.repository.resume(user, id)?.is_none() {
                return Err(TrackerServiceError::Validation(format!(
                    "resume '{id}' does not exist"
                )));
            }
        }
        if let Some(id) = referral {
            if self.repository.referral(user, id)?.is_none() {
                return Err(TrackerServiceError::Validation(format!(
                    "referral '{id}' does not exist"
                )));
            }
        }
        Ok(())
    }

    pub fn list_applications(
        &self,
        user: &UserId,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, TrackerServiceError> {
        Ok(query.apply(self.all_applications(user)?))
    }

    pub fn get_application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<Application, TrackerServiceError> {
        self.repository
            .application(user, id)?
            .ok_or_else(|| not_found("application", id))
    }

    /// The application with its resume, referral and interviews attached.
    pub fn application_details(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<ApplicationDetails, TrackerServiceError> {
        let application = self.get_application(user, id)?;
        let resume = match &application.resume_id {
            Some(resume_id) => self.repository.resume(user, resume_id)?,
            None => None,
        };
        let referral = match &application.referral_id {
            Some(referral_id) => self.repository.referral(user, referral_id)?,
            None => None,
        };
        let interviews = self.interviews_for_application(user, id)?;

        Ok(ApplicationDetails {
            application,
            resume,
            referral,
            interviews,
        })
    }

    pub fn create_application(
        &self,
        user: &UserId,
        submission: NewApplication,
    ) -> Result<Application, TrackerServiceError> {
        required(&submission.company_name, "company_name")?;
        required(&submission.role, "role")?;
        self.ensure_links(
            user,
            submission.resume_id.as_ref(),
            submission.referral_id.as_ref(),
        )?;

        let record =
            submission.into_record(ApplicationId(next_id("app")), user.clone(), Utc::now());
        let stored = self.repository.insert_application(record)?;
        info!(user = %user, application = %stored.id, company = %stored.company_name, "application created");
        self.record(user, Activity::ApplicationCreated(&stored));
        Ok(stored)
    }

    /// Applies a partial update. A status change is logged with its old and new values.
    pub fn update_application(
        &self,
        user: &UserId,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<Application, TrackerServiceError> {
        if let Some(company) = &patch.company_name {
            required(company, "company_name")?;
        }
        if let Some(role) = &patch.role {
            required(role, "role")?;
        }
        let mut record = self.get_application(user, id)?;
        self.ensure_links(
            user,
            patch.resume_id.as_ref().and_then(Option::as_ref),
            patch.referral_id.as_ref().and_then(Option::as_ref),
        )?;

        let previous = record.status;
        let changes = patch.changed_fields();
        patch.apply(&mut record);
        record.updated_at = Utc::now();
        self.repository.update_application(record.clone())?;

        if record.status != previous {
            info!(user = %user, application = %id, from = %previous, to = %record.status, "application status changed");
            self.record(
                user,
                Activity::ApplicationStatusChanged {
                    application: &record,
                    from: previous,
                    to: record.status,
                },
            );
        } else {
            info!(user = %user, application = %id, "application updated");
            self.record(
                user,
                Activity::ApplicationUpdated {
                    application: &record,
                    changes: &changes,
                },
            );
        }
        Ok(record)
    }

    /// Deletes the application together with its interviews.
    pub fn delete_application(
        &self,
        user: &UserId,
        id: &ApplicationId,
    ) -> Result<(), TrackerServiceError> {
        let record = self.get_application(user, id)?;
        for interview in self.interviews_for_application(user, id)? {
            self.repository.delete_interview(user, &interview.id)?;
        }
        if !self.repository.delete_application(user, id)? {
            return Err(not_found("application", id));
        }
        info!(user = %user, application = %id, "application deleted");
        self.record(user, Activity::ApplicationDeleted(&record));
        Ok(())
    }

    pub fn applications_for_referral(
        &self,
        user: &UserId,
        referral: &ReferralId,
    ) -> Result<Vec<Application>, TrackerServiceError> {
        self.get_referral(user, referral)?;
        Ok(self
            .all_applications(user)?
            .into_iter()
            .filter(|application| application.referral_id.as_ref() == Some(referral))
            .collect())
    }

    pub fn status_board(&self, user: &UserId) -> Result<Vec<BoardColumn>, TrackerServiceError> {
        Ok(report::status_board(&self.all_applications(user)?))
    }

    pub fn list_referrals(&self, user: &UserId) -> Result<Vec<Referral>, TrackerServiceError> {
        Ok(self.repository.referrals(user)?)
    }

    pub fn get_referral(
        &self,
        user: &UserId,
        id: &ReferralId,
    ) -> Result<Referral, TrackerServiceError> {
        self.repository
            .referral(user, id)?
            .ok_or_else(|| not_found("referral", id))
    }

    pub fn create_referral(
        &self,
        user: &UserId,
        submission: NewReferral,
    ) -> Result<Referral, TrackerServiceError> {
        required(&submission.person_name, "person_name")?;
        required(&submission.company, "company")?;

        let record = submission.into_record(ReferralId(next_id("ref")), user.clone(), Utc::now());
        let stored = self.repository.insert_referral(record)?;
        info!(user = %user, referral = %stored.id, "referral created");
        self.record(user, Activity::ReferralCreated(&stored));
        Ok(stored)
    }

    pub fn update_referral(
        &self,
        user: &UserId,
        id: &ReferralId,
        patch: ReferralPatch,
    ) -> Result<Referral, TrackerServiceError> {
        if let Some(person) = &patch.person_name {
            required(person, "person_name")?;
        }
        if let Some(company) = &patch.company {
            required(company, "company")?;
        }

        let mut record = self.get_referral(user, id)?;
        let changes = patch.changed_fields();
        patch.apply(&mut record);
        self.repository.update_referral(record.clone())?;
        info!(user = %user, referral = %id, "referral updated");
        self.record(
            user,
            Activity::ReferralUpdated {
                referral: &record,
                changes: &changes,
            },
        );
        Ok(record)
    }

    /// Deletes the referral and unlinks it from any application.
    pub fn delete_referral(&self, user: &UserId, id: &ReferralId) -> Result<(), TrackerServiceError> {
        let record = self.get_referral(user, id)?;
        let now = Utc::now();
        for mut application in self.all_applications(user)? {
            if application.referral_id.as_ref() == Some(id) {
                application.referral_id = None;
                application.updated_at = now;
                self.repository.update_application(application)?;
            }
        }
        if !self.repository.delete_referral(user, id)? {
            return Err(not_found("referral", id));
        }
        info!(user = %user, referral = %id, "referral deleted");
        self.record(user, Activity::ReferralDeleted(&record));
        Ok(())
    }

    pub fn list_resumes(&self, user: &UserId) -> Result<Vec<Resume>, TrackerServiceError> {
        Ok(self.repository.resumes(user)?)
    }

    pub fn get_resume(&self, user: &UserId, id: &ResumeId) -> Result<Resume, TrackerServiceError> {
        self.repository
            .resume(user, id)?
            .ok_or_else(|| not_found("resume", id))
    }

    /// Stores a PDF under `<user>/<millis>_<name>` and records the new version.
    pub fn upload_resume(
        &self,
        user: &UserId,
        upload: ResumeUpload,
    ) -> Result<Resume, TrackerServiceError> {
        required(&upload.version_name, "version_name")?;
        required(&upload.file_name, "file_name")?;
        if upload.bytes.is_empty() {
            return Err(TrackerServiceError::Validation(
                "resume file is empty".to_string(),
            ));
        }
        if upload.bytes.len() > self.config.max_resume_bytes {
            return Err(TrackerServiceError::Validation(format!(
                "resume is {} bytes, the limit is {}",
                upload.bytes.len(),
                self.config.max_resume_bytes
            )));
        }
        let content_type = resume_content_type(&upload)?;

        let now = Utc::now();
        let key = format!(
            "{user}/{}_{}",
            now.timestamp_millis(),
            sanitize_file_name(upload.file_name.trim())
        );
        let bucket = &self.config.resume_bucket;
        let file_url = self
            .storage
            .upload(bucket, &key, upload.bytes, &content_type)?;

        let record = Resume {
            id: ResumeId(next_id("res")),
            user_id: user.clone(),
            version_name: upload.version_name.trim().to_string(),
            file_url,
            upload_date: now.date_naive(),
            times_used: 0,
            success_rate: 0.0,
            created_at: now,
        };
        let stored = match self.repository.insert_resume(record) {
            Ok(stored) => stored,
            Err(error) => {
                if let Err(cleanup) = self.storage.remove(bucket, &key) {
                    warn!(%key, error = %cleanup, "failed to remove orphaned resume file");
                }
                return Err(error.into());
            }
        };
        info!(user = %user, resume = %stored.id, %key, "resume uploaded");
        self.record(user, Activity::ResumeUploaded(&stored));
        Ok(stored)
    }

    pub fn update_resume(
        &self,
        user: &UserId,
        id: &ResumeId,
        patch: ResumePatch,
    ) -> Result<Resume, TrackerServiceError> {
        if let Some(name) = &patch.version_name {
            required(name, "version_name")?;
        }

        let mut record = self.get_resume(user, id)?;
        let changes = patch.changed_fields();
        patch.apply(&mut record);
        self.repository.update_resume(record.clone())?;
        info!(user = %user, resume = %id, "resume updated");
        self.record(
            user,
            Activity::ResumeUpdated {
                resume: &record,
                changes: &changes,
            },
        );
        Ok(record)
    }

    /// Deletes the resume row, unlinks it from applications and removes the
    /// stored file. A failed file removal is only traced.
    pub fn delete_resume(&self, user: &UserId, id: &ResumeId) -> Result<(), TrackerServiceError> {
        let record = self.get_resume(user, id)?;
        let bucket = &self.config.resume_bucket;
        let key = storage_key(bucket, &record.file_url);
        if let Err(error) = self.storage.remove(bucket, key) {
            warn!(user = %user, resume = %id, %key, %error, "failed to remove resume file");
        }

        let now = Utc::now();
        for mut application in self.all_applications(user)? {
            if application.resume_id.as_ref() == Some(id) {
                application.resume_id = None;
                application.updated_at = now;
                self.repository.update_application(application)?;
            }
        }
        if !self.repository.delete_resume(user, id)? {
            return Err(not_found("resume", id));
        }
        info!(user = %user, resume = %id, "resume deleted");
        self.record(user, Activity::ResumeDeleted(&record));
        Ok(())
    }

    pub fn download_resume(
        &self,
        user: &UserId,
        id: &ResumeId,
    ) -> Result<Vec<u8>, TrackerServiceError> {
        let record = self.get_resume(user, id)?;
        let bucket = &self.config.resume_bucket;
        Ok(self
            .storage
            .download(bucket, storage_key(bucket, &record.file_url))?)
    }

    pub fn list_interviews(
        &self,
        user: &UserId,
        range: DateRange,
    ) -> Result<Vec<Interview>, TrackerServiceError> {
        Ok(self.repository.interviews(user, &range)?)
    }

    pub fn interviews_for_application(
        &self,
        user: &UserId,
        application: &ApplicationId,
    ) -> Result<Vec<Interview>, TrackerServiceError> {
        Ok(self
            .repository
            .interviews(user, &DateRange::unbounded())?
            .into_iter()
            .filter(|interview| &interview.application_id == application)
            .collect())
    }

    pub fn get_interview(
        &self,
        user: &UserId,
        id: &InterviewId,
    ) -> Result<Interview, TrackerServiceError> {
        self.repository
            .interview(user, id)?
            .ok_or_else(|| not_found("interview", id))
    }

    pub fn create_interview(
        &self,
        user: &UserId,
        submission: NewInterview,
    ) -> Result<Interview, TrackerServiceError> {
        required(&submission.round_name, "round_name")?;
        let Some(application) = self
            .repository
            .application(user, &submission.application_id)?
        else {
            return Err(TrackerServiceError::Validation(format!(
                "application '{}' does not exist",
                submission.application_id
            )));
        };

        let record = submission.into_record(InterviewId(next_id("int")), user.clone(), Utc::now());
        if record.status == InterviewStatus::Completed && record.feedback.is_none() {
            debug!(interview = %record.id, "completed interview stored without feedback");
        }
        let stored = self.repository.insert_interview(record)?;
        info!(user = %user, interview = %stored.id, application = %application.id, "interview scheduled");
        self.record(
            user,
            Activity::InterviewScheduled {
                interview: &stored,
                company: &application.company_name,
            },
        );
        Ok(stored)
    }

    pub fn update_interview(
        &self,
        user: &UserId,
        id: &InterviewId,
        patch: InterviewPatch,
    ) -> Result<Interview, TrackerServiceError> {
        if let Some(round) = &patch.round_name {
            required(round, "round_name")?;
        }

        let mut record = self.get_interview(user, id)?;
        let changes = patch.changed_fields();
        patch.apply(&mut record);
        if record.status == InterviewStatus::Completed && record.feedback.is_none() {
            debug!(interview = %record.id, "completed interview stored without feedback");
        }
        self.repository.update_interview(record.clone())?;

        let company = self.company_for(user, &record.application_id);
        info!(user = %user, interview = %id, "interview updated");
        self.record(
            user,
            Activity::InterviewUpdated {
                interview: &record,
                company: &company,
                changes: &changes,
            },
        );
        Ok(record)
    }

    pub fn delete_interview(
        &self,
        user: &UserId,
        id: &InterviewId,
    ) -> Result<(), TrackerServiceError> {
        let record = self.get_interview(user, id)?;
        if !self.repository.delete_interview(user, id)? {
            return Err(not_found("interview", id));
        }
        let company = self.company_for(user, &record.application_id);
        info!(user = %user, interview = %id, "interview deleted");
        self.record(
            user,
            Activity::InterviewDeleted {
                interview: &record,
                company: &company,
            },
        );
        Ok(())
    }

    /// Saved preferences, or the defaults when the user never saved any.
    pub fn preferences(&self, user: &UserId) -> Result<UserPreferences, TrackerServiceError> {
        Ok(self
            .repository
            .preferences(user)?
            .unwrap_or_else(|| UserPreferences::defaults_for(user.clone(), Utc::now())))
    }

    pub fn update_preferences(
        &self,
        user: &UserId,
        patch: PreferencesPatch,
    ) -> Result<UserPreferences, TrackerServiceError> {
        let mut record = self.preferences(user)?;
        patch.apply(&mut record);
        record.updated_at = Utc::now();
        self.repository.save_preferences(record.clone())?;
        info!(user = %user, "preferences saved");
        Ok(record)
    }

    /// Latest activity as feed items, newest first. Uses the configured limit
    /// when none is given.
    pub fn recent_activity(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityItem>, TrackerServiceError> {
        let limit = limit.unwrap_or(self.config.activity_limit);
        Ok(self
            .repository
            .recent_activity(user, limit)?
            .into_iter()
            .map(ActivityItem::from)
            .collect())
    }

    pub fn dashboard(
        &self,
        user: &UserId,
        now: NaiveDateTime,
    ) -> Result<DashboardStats, TrackerServiceError> {
        let everything = DateRange::unbounded();
        let applications = self.repository.applications(user, &everything)?;
        let referrals = self.repository.referrals(user)?;
        let resumes = self.repository.resumes(user)?;
        let interviews = self.repository.interviews(user, &everything)?;
        debug!(user = %user, applications = applications.len(), "building dashboard");
        Ok(report::dashboard_stats(
            &applications,
            &referrals,
            &resumes,
            &interviews,
            now,
        ))
    }

    pub fn analytics(
        &self,
        user: &UserId,
        range: DateRange,
    ) -> Result<AnalyticsReport, TrackerServiceError> {
        let applications = self.repository.applications(user, &range)?;
        let resumes = self.repository.resumes(user)?;
        debug!(user = %user, applications = applications.len(), ?range, "building analytics");
        Ok(trends::analytics_report(
            &applications,
            &resumes,
            range,
            self.config.company_limit,
        ))
    }

    /// Interviews and referral follow-ups falling inside `range`, oldest first.
    pub fn calendar(
        &self,
        user: &UserId,
        range: DateRange,
    ) -> Result<Vec<CalendarEvent>, TrackerServiceError> {
        let interviews = self.repository.interviews(user, &range)?;
        let applications = self.all_applications(user)?;
        let referrals: Vec<Referral> = self
            .repository
            .referrals(user)?
            .into_iter()
            .filter(|referral| referral.follow_up_date.is_some_and(|day| range.contains(day)))
            .collect();
        Ok(calendar::events_from(&interviews, &applications, &referrals))
    }

    pub fn upcoming(
        &self,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<PeriodBuckets, TrackerServiceError> {
        let events = self.calendar(user, DateRange::unbounded())?;
        debug!(user = %user, events = events.len(), %today, "grouping calendar");
        Ok(calendar::group_by_period(events, today))
    }

    pub fn today(&self, user: &UserId, today: NaiveDate) -> Result<TodayItems, TrackerServiceError> {
        let events = self.calendar(user, DateRange::between(today, today))?;
        Ok(calendar::today_action_items(&events, today))
    }

    pub fn month(
        &self,
        user: &UserId,
        year: i32,
        month: u32,
    ) -> Result<MonthGrid, TrackerServiceError> {
        let invalid = || TrackerServiceError::Validation(format!("{year}-{month} is not a valid month"));
        let range = DateRange::month(year, month).ok_or_else(invalid)?;
        let events = self.calendar(user, range)?;
        calendar::month_grid(year, month, &events).ok_or_else(invalid)
    }
}

/// Error raised by the tracker service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized_for_keys() {
        assert_eq!(sanitize_file_name("My Resume (v2).pdf"), "My_Resume__v2_.pdf");
        assert_eq!(sanitize_file_name("backend-2026_final.pdf"), "backend-2026_final.pdf");
    }

    #[test]
    fn storage_key_strips_bucket_prefix() {
        assert_eq!(
            storage_key(
                "resumes",
                "https://files.example.com/storage/v1/object/public/resumes/user-1/1_cv.pdf"
            ),
            "user-1/1_cv.pdf"
        );
        assert_eq!(storage_key("resumes", "user-1/1_cv.pdf"), "user-1/1_cv.pdf");
    }

    #[test]
    fn content_type_falls_back_to_file_extension() {
        let mut upload = ResumeUpload {
            version_name: "v1".to_string(),
            file_name: "cv.pdf".to_string(),
            content_type: None,
            bytes: b"%PDF-1.7".to_vec(),
        };
        assert_eq!(
            resume_content_type(&upload).expect("pdf accepted"),
            mime::APPLICATION_PDF
        );

        upload.file_name = "cv.docx".to_string();
        assert!(matches!(
            resume_content_type(&upload),
            Err(TrackerServiceError::Validation(_))
        ));

        upload.content_type = Some("application/pdf".to_string());
        assert!(resume_content_type(&upload).is_ok());

        upload.content_type = Some("image/png".to_string());
        assert!(resume_content_type(&upload).is_err());
    }
}
