use std::convert::Infallible;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::CookieJar;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::identity::FederatedCredential;
use crate::models::student::StudentRecord;
use crate::profile::service::{
    load_profile, submit_profile, ProfileSubmission, ProfileView, ResumeUpload,
};
use crate::records::RecordSubscription;
use crate::sessions::{
    expired_session_cookie, new_token, session_cookie, CurrentSession, OptionalSession, Role,
    Session, StudentSession,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub profile: ProfileView,
}

/// External résumé builder offered next to the profile form.
#[derive(Debug, Serialize)]
pub struct ResumeBuilder {
    pub name: &'static str,
    pub url: &'static str,
}

pub static RESUME_BUILDERS: [ResumeBuilder; 4] = [
    ResumeBuilder { name: "Zety", url: "https://zety.com/" },
    ResumeBuilder { name: "resume.io", url: "https://resume.io/" },
    ResumeBuilder { name: "enhancv", url: "https://enhancv.com/" },
    ResumeBuilder { name: "Kickresume", url: "https://www.kickresume.com/" },
];

#[derive(Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProfileScreen {
    SignedOut,
    SignedIn {
        profile: ProfileView,
        resume_builders: &'static [ResumeBuilder],
    },
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub record: StudentRecord,
}

/// POST /api/v1/auth/student
pub async fn handle_student_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credential): Json<FederatedCredential>,
) -> Result<(CookieJar, Json<SignInResponse>), AppError> {
    let identity = state.identity.sign_in_federated(&credential).await?;
    let profile = load_profile(state.records.as_ref(), &identity).await;

    let mut session = Session::new(identity, Role::Student);
    session.has_record = profile.existing;
    let token = new_token();
    state.sessions.save(&token, &session).await?;
    info!("Student {} signed in", session.identity.uid);

    Ok((
        jar.add(session_cookie(&token)),
        Json(SignInResponse { token, profile }),
    ))
}

/// GET /Users
pub async fn handle_get_profile(
    State(state): State<AppState>,
    OptionalSession(current): OptionalSession,
) -> Result<Json<ProfileScreen>, AppError> {
    let Some(CurrentSession { token, mut session }) = current else {
        return Ok(Json(ProfileScreen::SignedOut));
    };

    let profile = load_profile(state.records.as_ref(), &session.identity).await;
    if session.has_record != profile.existing {
        session.has_record = profile.existing;
        state.sessions.save(&token, &session).await?;
    }
    Ok(Json(ProfileScreen::SignedIn {
        profile,
        resume_builders: &RESUME_BUILDERS,
    }))
}

/// POST /Users
pub async fn handle_submit_profile(
    State(state): State<AppState>,
    StudentSession(CurrentSession { token, mut session }): StudentSession,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, AppError> {
    let submission = read_submission(multipart).await?;
    let record = submit_profile(
        state.records.as_ref(),
        state.blobs.as_ref(),
        &session,
        submission,
    )
    .await?;

    if !session.has_record {
        session.has_record = true;
        state.sessions.save(&token, &session).await?;
    }
    Ok(Json(SubmitResponse { record }))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    OptionalSession(current): OptionalSession,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    if let Some(current) = current {
        state.sessions.clear(&current.token).await?;
        info!("{} signed out", current.session.identity.uid);
    }
    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}

/// GET /api/v1/profile/live
///
/// Streams the caller's record as server-sent `record` events: the current
/// state first, then every change. The subscription is dropped together with
/// the stream when the client disconnects.
pub async fn handle_profile_live(
    State(state): State<AppState>,
    StudentSession(CurrentSession { session, .. }): StudentSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let uid = session.identity.uid;
    // Subscribe before the snapshot read so no change slips in between.
    let subscription = state.records.subscribe(&uid);

    let snapshot = match state.records.get(&uid).await {
        Ok(record) => record,
        Err(e) if e.is_unavailable() => {
            warn!("Record store offline for live profile {uid}: {e}");
            None
        }
        Err(e) => {
            error!("Live profile read failed for {uid}: {e}");
            None
        }
    };

    let live = stream::unfold(subscription, |mut sub: RecordSubscription| async move {
        sub.next().await.map(|record| (record, sub))
    });

    let events = stream::iter(snapshot)
        .chain(live)
        .map(|record| Ok(record_event(&record)));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn record_event(record: &StudentRecord) -> Event {
    Event::default()
        .event("record")
        .json_data(record)
        .unwrap_or_else(|e| {
            error!("Could not serialize record {}: {e}", record.uid);
            Event::default().comment("unserializable record")
        })
}

async fn read_submission(mut multipart: Multipart) -> Result<ProfileSubmission, AppError> {
    let mut submission = ProfileSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Resume upload interrupted: {e}")))?;
                // Browsers send an empty part when no file was chosen.
                if !filename.is_empty() && !bytes.is_empty() {
                    submission.resume = Some(ResumeUpload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
            }
            "name" | "branch" | "cgpa" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?;
                match name.as_str() {
                    "name" => submission.name = Some(value),
                    "branch" => submission.branch = Some(value),
                    _ => submission.cgpa = Some(value),
                }
            }
            // email comes from the identity provider; anything else is ignored
            _ => {}
        }
    }

    Ok(submission)
}
