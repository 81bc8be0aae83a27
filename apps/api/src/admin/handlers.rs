use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::admin::export::{export_students, EXPORT_FILENAME, XLSX_CONTENT_TYPE};
use crate::admin::table::{Dashboard, DashboardQuery, DashboardView};
use crate::errors::AppError;
use crate::sessions::{new_token, session_cookie, AdminSession, Role, Session};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AdminSignInResponse {
    pub token: String,
    pub email: String,
}

/// POST /api/v1/auth/admin
///
/// Email/password sign-in, then the allowlist check. Both must pass.
pub async fn handle_admin_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<AdminCredentials>,
) -> Result<(CookieJar, Json<AdminSignInResponse>), AppError> {
    let identity = state
        .identity
        .sign_in_with_password(&credentials.email, &credentials.password)
        .await?;

    if !state.config.is_admin_email(&identity.email) {
        warn!("{} signed in but is not an admin", identity.email);
        return Err(AppError::Forbidden);
    }

    let email = identity.email.clone();
    let token = new_token();
    state
        .sessions
        .save(&token, &Session::new(identity, Role::Admin))
        .await?;
    info!("Admin {email} signed in");

    Ok((
        jar.add(session_cookie(&token)),
        Json(AdminSignInResponse { token, email }),
    ))
}

/// GET /Admin
pub async fn handle_dashboard(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, AppError> {
    let records = state.records.list_all().await?;

    let mut dashboard = Dashboard::new(state.config.default_page_size);
    dashboard.load(records);
    dashboard.apply(query)?;
    Ok(Json(dashboard.view()))
}

/// GET /api/v1/admin/export
pub async fn handle_export(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let records = state.records.list_all().await?;
    let bytes = export_students(
        records,
        Duration::from_millis(state.config.export_min_delay_ms),
    )
    .await?;
    info!("Export downloaded by {}", admin.session.identity.email);

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
