use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::domain::{
    ActivityAction, ActivityId, ActivityType, ApplicationId, ApplicationSource, ApplicationStatus,
    CompanyTier, InterviewId, InterviewStatus, Priority, ReferralId, ReferralStatus, ResumeId,
    UserId,
};

/// A job application as stored for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub user_id: UserId,
    pub company_name: String,
    pub role: String,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub source: Option<ApplicationSource>,
    pub status: ApplicationStatus,
    pub applied_date: NaiveDate,
    #[serde(default)]
    pub response_date: Option<NaiveDate>,
    #[serde(default)]
    pub offer_date: Option<NaiveDate>,
    #[serde(default)]
    pub company_tier: Option<CompanyTier>,
    #[serde(default)]
    pub resume_id: Option<ResumeId>,
    #[serde(default)]
    pub referral_id: Option<ReferralId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn tier(&self) -> CompanyTier {
        self.company_tier.unwrap_or(CompanyTier::Unknown)
    }

    pub fn is_referred(&self) -> bool {
        self.referral_id.is_some()
    }

    /// Whole days between applying and hearing back, when a response was recorded.
    pub fn days_to_response(&self) -> Option<i64> {
        self.response_date
            .map(|responded| (responded - self.applied_date).num_days())
    }

    pub fn days_to_offer(&self) -> Option<i64> {
        self.offer_date
            .map(|offered| (offered - self.applied_date).num_days())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    #[serde(default)]
    pub user_id: UserId,
    pub person_name: String,
    pub company: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub date_asked: Option<NaiveDate>,
    pub status: ReferralStatus,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// A stored resume version. Usage and success figures are maintained elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: ResumeId,
    #[serde(default)]
    pub user_id: UserId,
    pub version_name: String,
    pub file_url: String,
    pub upload_date: NaiveDate,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    #[serde(default)]
    pub user_id: UserId,
    pub application_id: ApplicationId,
    pub round_name: String,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub scheduled_at: Option<NaiveDateTime>,
    pub status: InterviewStatus,
    #[serde(default)]
    pub prep_notes: Option<String>,
    /// Only meaningful once the interview is completed.
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: UserId,
    pub email_notifications: bool,
    pub telegram_notifications: bool,
    pub telegram_chat_id: Option<String>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Email on, Telegram off; used until the user saves their own settings.
    pub fn defaults_for(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email_notifications: true,
            telegram_notifications: false,
            telegram_chat_id: None,
            user_email: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Append-only audit row feeding the recent activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub user_id: UserId,
    pub activity_type: ActivityType,
    pub action: ActivityAction,
    pub entity_id: String,
    pub entity_name: String,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An application joined with the records it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationDetails {
    #[serde(flatten)]
    pub application: Application,
    pub resume: Option<Resume>,
    pub referral: Option<Referral>,
    pub interviews: Vec<Interview>,
}

fn default_application_status() -> ApplicationStatus {
    ApplicationStatus::Applied
}

fn default_referral_status() -> ReferralStatus {
    ReferralStatus::Pending
}

fn default_interview_status() -> InterviewStatus {
    InterviewStatus::Scheduled
}

/// Form submission for a new application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub company_name: String,
    pub role: String,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub source: Option<ApplicationSource>,
    #[serde(default = "default_application_status")]
    pub status: ApplicationStatus,
    pub applied_date: NaiveDate,
    #[serde(default)]
    pub response_date: Option<NaiveDate>,
    #[serde(default)]
    pub offer_date: Option<NaiveDate>,
    #[serde(default)]
    pub company_tier: Option<CompanyTier>,
    #[serde(default)]
    pub resume_id: Option<ResumeId>,
    #[serde(default)]
    pub referral_id: Option<ReferralId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

impl NewApplication {
    pub fn new(company_name: &str, role: &str, applied_date: NaiveDate) -> Self {
        Self {
            company_name: company_name.to_string(),
            role: role.to_string(),
            job_link: None,
            job_id: None,
            source: None,
            status: ApplicationStatus::Applied,
            applied_date,
            response_date: None,
            offer_date: None,
            company_tier: None,
            resume_id: None,
            referral_id: None,
            notes: None,
            priority: Priority::default(),
            salary_range: None,
            tech_stack: Vec::new(),
        }
    }

    pub(crate) fn into_record(
        self,
        id: ApplicationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Application {
        Application {
            id,
            user_id,
            company_name: self.company_name.trim().to_string(),
            role: self.role.trim().to_string(),
            job_link: self.job_link,
            job_id: self.job_id,
            source: self.source,
            status: self.status,
            applied_date: self.applied_date,
            response_date: self.response_date,
            offer_date: self.offer_date,
            company_tier: self.company_tier,
            resume_id: self.resume_id,
            referral_id: self.referral_id,
            notes: self.notes,
            priority: self.priority,
            salary_range: self.salary_range,
            tech_stack: self.tech_stack,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Outer `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApplicationPatch {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub job_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub job_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub source: Option<Option<ApplicationSource>>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub applied_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "present")]
    pub response_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub offer_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub company_tier: Option<Option<CompanyTier>>,
    #[serde(default, deserialize_with = "present")]
    pub resume_id: Option<Option<ResumeId>>,
    #[serde(default, deserialize_with = "present")]
    pub referral_id: Option<Option<ReferralId>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub salary_range: Option<Option<String>>,
    #[serde(default)]
    pub tech_stack: Option<Vec<String>>,
}

impl ApplicationPatch {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Names of the fields this patch touches, for the activity description.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        mark(self.company_name.is_some(), "company_name");
        mark(self.role.is_some(), "role");
        mark(self.job_link.is_some(), "job_link");
        mark(self.job_id.is_some(), "job_id");
        mark(self.source.is_some(), "source");
        mark(self.status.is_some(), "status");
        mark(self.applied_date.is_some(), "applied_date");
        mark(self.response_date.is_some(), "response_date");
        mark(self.offer_date.is_some(), "offer_date");
        mark(self.company_tier.is_some(), "company_tier");
        mark(self.resume_id.is_some(), "resume_id");
        mark(self.referral_id.is_some(), "referral_id");
        mark(self.notes.is_some(), "notes");
        mark(self.priority.is_some(), "priority");
        mark(self.salary_range.is_some(), "salary_range");
        mark(self.tech_stack.is_some(), "tech_stack");
        fields
    }

    pub fn apply(self, record: &mut Application) {
        if let Some(company_name) = self.company_name {
            record.company_name = company_name.trim().to_string();
        }
        if let Some(role) = self.role {
            record.role = role.trim().to_string();
        }
        assign(&mut record.job_link, self.job_link);
        assign(&mut record.job_id, self.job_id);
        assign(&mut record.source, self.source);
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(applied_date) = self.applied_date {
            record.applied_date = applied_date;
        }
        assign(&mut record.response_date, self.response_date);
        assign(&mut record.offer_date, self.offer_date);
        assign(&mut record.company_tier, self.company_tier);
        assign(&mut record.resume_id, self.resume_id);
        assign(&mut record.referral_id, self.referral_id);
        assign(&mut record.notes, self.notes);
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        assign(&mut record.salary_range, self.salary_range);
        if let Some(tech_stack) = self.tech_stack {
            record.tech_stack = tech_stack;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReferral {
    pub person_name: String,
    pub company: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub date_asked: Option<NaiveDate>,
    #[serde(default = "default_referral_status")]
    pub status: ReferralStatus,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewReferral {
    pub fn new(person_name: &str, company: &str) -> Self {
        Self {
            person_name: person_name.to_string(),
            company: company.to_string(),
            linkedin_url: None,
            relationship: None,
            date_asked: None,
            status: ReferralStatus::Pending,
            follow_up_date: None,
            notes: None,
        }
    }

    pub(crate) fn into_record(
        self,
        id: ReferralId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Referral {
        Referral {
            id,
            user_id,
            person_name: self.person_name.trim().to_string(),
            company: self.company.trim().to_string(),
            linkedin_url: self.linkedin_url,
            relationship: self.relationship,
            date_asked: self.date_asked,
            status: self.status,
            follow_up_date: self.follow_up_date,
            notes: self.notes,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReferralPatch {
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub relationship: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub date_asked: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub status: Option<ReferralStatus>,
    #[serde(default, deserialize_with = "present")]
    pub follow_up_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

impl ReferralPatch {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            (self.person_name.is_some(), "person_name"),
            (self.company.is_some(), "company"),
            (self.linkedin_url.is_some(), "linkedin_url"),
            (self.relationship.is_some(), "relationship"),
            (self.date_asked.is_some(), "date_asked"),
            (self.status.is_some(), "status"),
            (self.follow_up_date.is_some(), "follow_up_date"),
            (self.notes.is_some(), "notes"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    pub fn apply(self, record: &mut Referral) {
        if let Some(person_name) = self.person_name {
            record.person_name = person_name.trim().to_string();
        }
        if let Some(company) = self.company {
            record.company = company.trim().to_string();
        }
        assign(&mut record.linkedin_url, self.linkedin_url);
        assign(&mut record.relationship, self.relationship);
        assign(&mut record.date_asked, self.date_asked);
        if let Some(status) = self.status {
            record.status = status;
        }
        assign(&mut record.follow_up_date, self.follow_up_date);
        assign(&mut record.notes, self.notes);
    }
}

/// Raw resume upload as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub version_name: String,
    pub file_name: String,
    /// Declared MIME type; guessed from the file name when absent.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResumePatch {
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub times_used: Option<u32>,
    #[serde(default)]
    pub success_rate: Option<f64>,
}

impl ResumePatch {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            (self.version_name.is_some(), "version_name"),
            (self.times_used.is_some(), "times_used"),
            (self.success_rate.is_some(), "success_rate"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    pub fn apply(self, record: &mut Resume) {
        if let Some(version_name) = self.version_name {
            record.version_name = version_name.trim().to_string();
        }
        if let Some(times_used) = self.times_used {
            record.times_used = times_used;
        }
        if let Some(success_rate) = self.success_rate {
            record.success_rate = success_rate.clamp(0.0, 100.0);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInterview {
    pub application_id: ApplicationId,
    pub round_name: String,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default = "default_interview_status")]
    pub status: InterviewStatus,
    #[serde(default)]
    pub prep_notes: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl NewInterview {
    pub fn new(
        application_id: ApplicationId,
        round_name: &str,
        scheduled_at: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            application_id,
            round_name: round_name.to_string(),
            scheduled_at,
            status: InterviewStatus::Scheduled,
            prep_notes: None,
            feedback: None,
        }
    }

    pub(crate) fn into_record(
        self,
        id: InterviewId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Interview {
        Interview {
            id,
            user_id,
            application_id: self.application_id,
            round_name: self.round_name.trim().to_string(),
            scheduled_at: self.scheduled_at,
            status: self.status,
            prep_notes: self.prep_notes,
            feedback: self.feedback,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InterviewPatch {
    #[serde(default)]
    pub round_name: Option<String>,
    #[serde(default, deserialize_with = "present_datetime")]
    pub scheduled_at: Option<Option<NaiveDateTime>>,
    #[serde(default)]
    pub status: Option<InterviewStatus>,
    #[serde(default, deserialize_with = "present")]
    pub prep_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub feedback: Option<Option<String>>,
}

impl InterviewPatch {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            (self.round_name.is_some(), "round_name"),
            (self.scheduled_at.is_some(), "scheduled_at"),
            (self.status.is_some(), "status"),
            (self.prep_notes.is_some(), "prep_notes"),
            (self.feedback.is_some(), "feedback"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    pub fn apply(self, record: &mut Interview) {
        if let Some(round_name) = self.round_name {
            record.round_name = round_name.trim().to_string();
        }
        assign(&mut record.scheduled_at, self.scheduled_at);
        if let Some(status) = self.status {
            record.status = status;
        }
        assign(&mut record.prep_notes, self.prep_notes);
        assign(&mut record.feedback, self.feedback);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreferencesPatch {
    #[serde(default)]
    pub email_notifications: Option<bool>,
    #[serde(default)]
    pub telegram_notifications: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub telegram_chat_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub user_email: Option<Option<String>>,
}

impl PreferencesPatch {
    pub fn apply(self, record: &mut UserPreferences) {
        if let Some(email) = self.email_notifications {
            record.email_notifications = email;
        }
        if let Some(telegram) = self.telegram_notifications {
            record.telegram_notifications = telegram;
        }
        assign(&mut record.telegram_chat_id, self.telegram_chat_id);
        assign(&mut record.user_email, self.user_email);
    }
}

fn assign<T>(slot: &mut Option<T>, patch: Option<Option<T>>) {
    if let Some(value) = patch {
        *slot = value;
    }
}

/// Marks a field as present so an explicit `null` becomes `Some(None)`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn present_datetime<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_datetime(deserializer).map(Some)
}

/// Accepts RFC 3339 stamps (converted to UTC), naive date-times taken as UTC,
/// and bare dates (midnight).
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(stamped) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamped.naive_utc());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub(crate) fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_datetime(&raw).ok_or_else(|| {
                de::Error::custom(format!("'{raw}' is not an ISO date or date-time"))
            })
        })
        .transpose()
}
