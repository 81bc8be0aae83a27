use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::blobs::{resume_path, BlobStore};
use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::student::{Branch, StudentRecord};
use crate::records::RecordStore;
use crate::sessions::Session;

/// What the profile screen shows for a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    /// Same value as `uid`.
    pub id: String,
    pub uid: String,
    pub email: String,
    /// A record exists; a new résumé file is optional on submit.
    pub existing: bool,
    pub name: String,
    pub branch: Option<Branch>,
    pub cgpa: Option<f64>,
    #[serde(rename = "resumeURL")]
    pub resume_url: String,
}

impl ProfileView {
    fn blank(identity: &Identity) -> Self {
        Self {
            id: identity.uid.clone(),
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            existing: false,
            name: String::new(),
            branch: None,
            cgpa: None,
            resume_url: String::new(),
        }
    }

    fn from_record(record: StudentRecord) -> Self {
        Self {
            id: record.uid.clone(),
            uid: record.uid,
            email: record.email,
            existing: true,
            name: record.name,
            branch: Some(record.branch),
            cgpa: Some(record.cgpa),
            resume_url: record.resume_url,
        }
    }
}

/// Reads the user's record for the profile screen.
///
/// A missing record and an unreachable store both yield a blank "new user"
/// view; the latter is only logged.
pub async fn load_profile(records: &dyn RecordStore, identity: &Identity) -> ProfileView {
    match records.get(&identity.uid).await {
        Ok(Some(record)) => ProfileView::from_record(record),
        Ok(None) => ProfileView::blank(identity),
        Err(e) if e.is_unavailable() => {
            warn!("Record store offline while loading profile {}: {e}", identity.uid);
            ProfileView::blank(identity)
        }
        Err(e) => {
            error!("Failed to load profile {}: {e}", identity.uid);
            ProfileView::blank(identity)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw profile form as submitted.
#[derive(Debug, Clone, Default)]
pub struct ProfileSubmission {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub cgpa: Option<String>,
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProfile {
    pub name: String,
    pub branch: Branch,
    pub cgpa: f64,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

impl ProfileSubmission {
    /// Checks the form without any I/O. A new user must attach a résumé.
    pub fn validate(&self, has_record: bool) -> Result<ValidatedProfile, AppError> {
        if !has_record && self.resume.is_none() {
            return Err(AppError::Validation(
                "Please upload your resume to create a profile".into(),
            ));
        }

        let name = required(&self.name, "Name")?.to_string();
        let branch = required(&self.branch, "Branch")?.parse::<Branch>()?;
        let raw_cgpa = required(&self.cgpa, "CGPA")?;
        let cgpa = raw_cgpa
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .ok_or_else(|| AppError::Validation(format!("CGPA '{raw_cgpa}' is not a number")))?;

        Ok(ValidatedProfile { name, branch, cgpa })
    }
}

/// Saves the profile of the session's user.
///
/// Uploads the attached résumé (if any) to `resumes/{uid}/{filename}`, then
/// merges the record keyed by uid. Without a new file the stored URL is kept.
/// If the record write fails after a fresh upload, that blob is deleted again
/// unless the existing record already points at the same object.
pub async fn submit_profile(
    records: &dyn RecordStore,
    blobs: &dyn BlobStore,
    session: &Session,
    submission: ProfileSubmission,
) -> Result<StudentRecord, AppError> {
    let profile = submission.validate(session.has_record)?;
    let identity = &session.identity;

    let previous = records.get(&identity.uid).await?;
    let previous_url = previous
        .as_ref()
        .map(|r| r.resume_url.clone())
        .unwrap_or_default();

    let mut uploaded: Option<String> = None;
    let resume_url = match submission.resume {
        Some(upload) => {
            let path = resume_path(&identity.uid, &upload.filename)?;
            blobs
                .upload(&path, upload.bytes, &upload.content_type)
                .await?;
            uploaded = Some(path.clone());
            match blobs.download_url(&path).await {
                Ok(url) => url,
                Err(e) => {
                    discard_upload(blobs, &path).await;
                    return Err(e);
                }
            }
        }
        None => previous_url.clone(),
    };

    let record = StudentRecord {
        uid: identity.uid.clone(),
        name: profile.name,
        email: identity.email.clone(),
        branch: profile.branch,
        cgpa: profile.cgpa,
        resume_url,
        updated_at: Utc::now(),
    };

    match records.upsert(record).await {
        Ok(saved) => {
            info!(
                "Profile saved for {} ({})",
                saved.uid,
                if uploaded.is_some() { "new resume" } else { "resume unchanged" }
            );
            Ok(saved)
        }
        Err(e) => {
            if let Some(path) = uploaded {
                let replaced_same_object = blobs
                    .download_url(&path)
                    .await
                    .is_ok_and(|url| url == previous_url);
                if !replaced_same_object {
                    discard_upload(blobs, &path).await;
                }
            }
            Err(e)
        }
    }
}

async fn discard_upload(blobs: &dyn BlobStore, path: &str) {
    match blobs.delete(path).await {
        Ok(()) => warn!("Removed orphaned upload {path} after a failed save"),
        Err(e) => error!("Orphaned upload {path} could not be removed: {e}"),
    }
}
