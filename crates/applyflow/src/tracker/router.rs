use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ApplicationId, DateRange, InterviewId, ReferralId, ResumeId, UserId};
use super::query::ApplicationQuery;
use super::records::{
    deserialize_optional_datetime, ApplicationPatch, InterviewPatch, NewApplication, NewInterview,
    NewReferral, PreferencesPatch, ReferralPatch, ResumePatch, ResumeUpload,
};
use super::repository::{RepositoryError, ResumeStorage, StorageError, TrackerRepository};
use super::service::{TrackerService, TrackerServiceError};

/// Header carrying the caller's identity, set by the auth gateway in front of the API.
pub const USER_HEADER: &str = "x-user-id";

/// Extra room above the resume limit so oversized uploads reach validation.
const UPLOAD_HEADROOM: usize = 64 * 1024;

type Tracker<R, S> = State<Arc<TrackerService<R, S>>>;

/// Router builder exposing the tracker's HTTP endpoints.
pub fn tracker_router<R, S>(service: Arc<TrackerService<R, S>>) -> Router
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let upload_limit = service.config().max_resume_bytes + UPLOAD_HEADROOM;

    Router::new()
        .route(
            "/api/v1/applications",
            get(list_applications::<R, S>).post(create_application::<R, S>),
        )
        .route("/api/v1/applications/board", get(status_board::<R, S>))
        .route(
            "/api/v1/applications/:application_id",
            get(get_application::<R, S>)
                .patch(update_application::<R, S>)
                .delete(delete_application::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/details",
            get(application_details::<R, S>),
        )
        .route(
            "/api/v1/applications/:application_id/interviews",
            get(application_interviews::<R, S>),
        )
        .route(
            "/api/v1/referrals",
            get(list_referrals::<R, S>).post(create_referral::<R, S>),
        )
        .route(
            "/api/v1/referrals/:referral_id",
            get(get_referral::<R, S>)
                .patch(update_referral::<R, S>)
                .delete(delete_referral::<R, S>),
        )
        .route(
            "/api/v1/referrals/:referral_id/applications",
            get(referral_applications::<R, S>),
        )
        .route(
            "/api/v1/resumes",
            get(list_resumes::<R, S>)
                .post(upload_resume::<R, S>)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/resumes/:resume_id",
            get(get_resume::<R, S>)
                .patch(update_resume::<R, S>)
                .delete(delete_resume::<R, S>),
        )
        .route("/api/v1/resumes/:resume_id/file", get(download_resume::<R, S>))
        .route(
            "/api/v1/interviews",
            get(list_interviews::<R, S>).post(create_interview::<R, S>),
        )
        .route(
            "/api/v1/interviews/:interview_id",
            get(get_interview::<R, S>)
                .patch(update_interview::<R, S>)
                .delete(delete_interview::<R, S>),
        )
        .route(
            "/api/v1/preferences",
            get(get_preferences::<R, S>).put(update_preferences::<R, S>),
        )
        .route("/api/v1/dashboard", get(dashboard::<R, S>))
        .route("/api/v1/activity", get(recent_activity::<R, S>))
        .route("/api/v1/analytics", get(analytics::<R, S>))
        .route("/api/v1/calendar", get(calendar::<R, S>))
        .route("/api/v1/calendar/upcoming", get(upcoming::<R, S>))
        .route("/api/v1/calendar/today", get(today::<R, S>))
        .route(
            "/api/v1/calendar/month/:year/:month",
            get(month::<R, S>),
        )
        .with_state(service)
}

/// Reads the caller from [`USER_HEADER`]; a missing or blank value is a 401.
pub(crate) fn identify(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from)
        .ok_or_else(|| {
            let payload = json!({ "error": "missing user identity" });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
}

pub(crate) fn error_response(error: TrackerServiceError) -> Response {
    let status = match &error {
        TrackerServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TrackerServiceError::NotFound { .. }
        | TrackerServiceError::Repository(RepositoryError::NotFound)
        | TrackerServiceError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        TrackerServiceError::Repository(RepositoryError::Conflict)
        | TrackerServiceError::Storage(StorageError::AlreadyExists(_)) => StatusCode::CONFLICT,
        TrackerServiceError::Repository(RepositoryError::Unavailable(_))
        | TrackerServiceError::Storage(StorageError::Transport(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    if status == StatusCode::SERVICE_UNAVAILABLE {
        tracing::error!(%error, "tracker backend unavailable");
    }

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn reply<T: Serialize>(status: StatusCode, result: Result<T, TrackerServiceError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error_response(error),
    }
}

fn no_content(result: Result<(), TrackerServiceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

macro_rules! caller {
    ($headers:expr) => {
        match identify(&$headers) {
            Ok(user) => user,
            Err(response) => return response,
        }
    };
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NowQuery {
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    now: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TodayQuery {
    #[serde(default)]
    today: Option<NaiveDate>,
}

impl TodayQuery {
    fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    version_name: String,
    file_name: String,
}

pub(crate) async fn list_applications<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(query): Query<ApplicationQuery>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.list_applications(&user, &query))
}

pub(crate) async fn create_application<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Json(submission): Json<NewApplication>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::CREATED,
        service.create_application(&user, submission),
    )
}

pub(crate) async fn status_board<R, S>(State(service): Tracker<R, S>, headers: HeaderMap) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.status_board(&user))
}

pub(crate) async fn get_application<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.get_application(&user, &ApplicationId(application_id)),
    )
}

pub(crate) async fn update_application<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(patch): Json<ApplicationPatch>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.update_application(&user, &ApplicationId(application_id), patch),
    )
}

pub(crate) async fn delete_application<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    no_content(service.delete_application(&user, &ApplicationId(application_id)))
}

pub(crate) async fn application_details<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.application_details(&user, &ApplicationId(application_id)),
    )
}

pub(crate) async fn application_interviews<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    let id = ApplicationId(application_id);
    let result = service
        .get_application(&user, &id)
        .and_then(|_| service.interviews_for_application(&user, &id));
    reply(StatusCode::OK, result)
}

pub(crate) async fn list_referrals<R, S>(State(service): Tracker<R, S>, headers: HeaderMap) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.list_referrals(&user))
}

pub(crate) async fn create_referral<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Json(submission): Json<NewReferral>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::CREATED, service.create_referral(&user, submission))
}

pub(crate) async fn get_referral<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(referral_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.get_referral(&user, &ReferralId(referral_id)),
    )
}

pub(crate) async fn update_referral<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(referral_id): Path<String>,
    Json(patch): Json<ReferralPatch>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.update_referral(&user, &ReferralId(referral_id), patch),
    )
}

pub(crate) async fn delete_referral<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(referral_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    no_content(service.delete_referral(&user, &ReferralId(referral_id)))
}

pub(crate) async fn referral_applications<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(referral_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.applications_for_referral(&user, &ReferralId(referral_id)),
    )
}

pub(crate) async fn list_resumes<R, S>(State(service): Tracker<R, S>, headers: HeaderMap) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.list_resumes(&user))
}

/// Raw file body; names travel in the query string and the type in `Content-Type`.
pub(crate) async fn upload_resume<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let upload = ResumeUpload {
        version_name: upload.version_name,
        file_name: upload.file_name,
        content_type,
        bytes: body.to_vec(),
    };
    reply(StatusCode::CREATED, service.upload_resume(&user, upload))
}

pub(crate) async fn get_resume<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(resume_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.get_resume(&user, &ResumeId(resume_id)))
}

pub(crate) async fn update_resume<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(resume_id): Path<String>,
    Json(patch): Json<ResumePatch>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.update_resume(&user, &ResumeId(resume_id), patch),
    )
}

pub(crate) async fn delete_resume<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(resume_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    no_content(service.delete_resume(&user, &ResumeId(resume_id)))
}

pub(crate) async fn download_resume<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(resume_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    match service.download_resume(&user, &ResumeId(resume_id)) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_interviews<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(range): Query<DateRange>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.list_interviews(&user, range))
}

pub(crate) async fn create_interview<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Json(submission): Json<NewInterview>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::CREATED, service.create_interview(&user, submission))
}

pub(crate) async fn get_interview<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.get_interview(&user, &InterviewId(interview_id)),
    )
}

pub(crate) async fn update_interview<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    Json(patch): Json<InterviewPatch>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(
        StatusCode::OK,
        service.update_interview(&user, &InterviewId(interview_id), patch),
    )
}

pub(crate) async fn delete_interview<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    no_content(service.delete_interview(&user, &InterviewId(interview_id)))
}

pub(crate) async fn get_preferences<R, S>(State(service): Tracker<R, S>, headers: HeaderMap) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.preferences(&user))
}

pub(crate) async fn update_preferences<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Json(patch): Json<PreferencesPatch>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.update_preferences(&user, patch))
}

pub(crate) async fn dashboard<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(query): Query<NowQuery>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    let now = query.now.unwrap_or_else(|| Utc::now().naive_utc());
    reply(StatusCode::OK, service.dashboard(&user, now))
}

pub(crate) async fn recent_activity<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.recent_activity(&user, query.limit))
}

pub(crate) async fn analytics<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(range): Query<DateRange>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.analytics(&user, range))
}

pub(crate) async fn calendar<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(range): Query<DateRange>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.calendar(&user, range))
}

pub(crate) async fn upcoming<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(query): Query<TodayQuery>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.upcoming(&user, query.resolve()))
}

pub(crate) async fn today<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Query(query): Query<TodayQuery>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.today(&user, query.resolve()))
}

pub(crate) async fn month<R, S>(
    State(service): Tracker<R, S>,
    headers: HeaderMap,
    Path((year, month)): Path<(i32, u32)>,
) -> Response
where
    R: TrackerRepository + 'static,
    S: ResumeStorage + 'static,
{
    let user = caller!(headers);
    reply(StatusCode::OK, service.month(&user, year, month))
}
