pub mod health;
pub mod landing;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(landing::landing_handler))
        .route("/health", get(health::health_handler))
        // Student profile screen
        .route(
            "/Users",
            get(profile::handle_get_profile).post(profile::handle_submit_profile),
        )
        .route("/api/v1/auth/student", post(profile::handle_student_sign_in))
        .route("/api/v1/auth/sign-out", post(profile::handle_sign_out))
        .route("/api/v1/profile/live", get(profile::handle_profile_live))
        // Admin dashboard screen
        .route("/Admin", get(admin::handle_dashboard))
        .route("/api/v1/auth/admin", post(admin::handle_admin_sign_in))
        .route("/api/v1/admin/export", get(admin::handle_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use futures::StreamExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::testing::{memory_state, FakeIdentity};

    const BOUNDARY: &str = "collector-test-boundary";

    fn app() -> Router {
        build_router(memory_state(
            FakeIdentity::default()
                .with_student("tok-asha", "u1", "asha@college.edu")
                .with_password("dean@college.edu", "secret", "a1")
                .with_password("prof@college.edu", "secret", "a2"),
        ))
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn session_cookie_of(response: &Response) -> String {
        let raw = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    fn profile_form(fields: &[(&str, &str)], file: Option<(&str, &[u8])>, cookie: &str) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/Users")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(COOKIE, cookie)
            .body(Body::from(body))
            .unwrap()
    }

    async fn student_cookie(app: &Router) -> String {
        let response = send(app, post_json("/api/v1/auth/student", json!({"id_token": "tok-asha"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_of(&response)
    }

    async fn admin_cookie(app: &Router) -> String {
        let response = send(
            app,
            post_json(
                "/api/v1/auth/admin",
                json!({"email": "dean@college.edu", "password": "secret"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_of(&response)
    }

    #[tokio::test]
    async fn test_landing_links_both_screens() {
        let response = send(&app(), Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("href=\"/Users\""));
        assert!(html.contains("href=\"/Admin\""));
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(&app(), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_rejected_federated_sign_in() {
        let response = send(&app(), post_json("/api/v1/auth/student", json!({"id_token": "forged"}))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "AUTHENTICATION_FAILED");
    }

    #[tokio::test]
    async fn test_profile_without_session_is_signed_out() {
        let response = send(&app(), Request::get("/Users").body(Body::empty()).unwrap()).await;
        assert_eq!(json_body(response).await["state"], "signed_out");
    }

    #[tokio::test]
    async fn test_new_student_must_attach_resume() {
        let app = app();
        let cookie = student_cookie(&app).await;

        let response = send(
            &app,
            profile_form(&[("name", "Asha"), ("branch", "CSE"), ("cgpa", "8.5")], None, &cookie),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_requires_session() {
        let response = send(
            &app(),
            profile_form(&[("name", "Asha")], Some(("resume.pdf", b"%PDF")), "collector_session=nope"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_asha_submits_and_profile_is_prefilled() {
        let app = app();
        let cookie = student_cookie(&app).await;

        let response = send(
            &app,
            profile_form(
                &[("name", "Asha"), ("branch", "CSE"), ("cgpa", "8.5"), ("email", "spoof@x.com")],
                Some(("resume.pdf", b"%PDF-1.7")),
                &cookie,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let record = &json_body(response).await["record"];
        assert_eq!(record["uid"], "u1");
        assert_eq!(record["email"], "asha@college.edu");
        assert!(record["resumeURL"].as_str().unwrap().ends_with("resume.pdf"));

        let screen = json_body(send(&app, get_with("/Users", &cookie)).await).await;
        assert_eq!(screen["state"], "signed_in");
        let profile = &screen["profile"];
        assert_eq!(profile["existing"], true);
        assert_eq!(profile["name"], "Asha");
        assert_eq!(profile["branch"], "CSE");
        assert_eq!(profile["cgpa"], 8.5);
        assert_eq!(profile["id"], "u1");
        let builders = screen["resume_builders"].as_array().unwrap();
        assert_eq!(builders.len(), 4);
        assert_eq!(builders[0]["url"], "https://zety.com/");

        // Existing user: a new file is optional now.
        let response = send(
            &app,
            profile_form(&[("name", "Asha"), ("branch", "ECE"), ("cgpa", "8.7")], None, &cookie),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let record = &json_body(response).await["record"];
        assert_eq!(record["branch"], "ECE");
        assert!(record["resumeURL"].as_str().unwrap().ends_with("resume.pdf"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let app = app();
        let cookie = student_cookie(&app).await;

        let response = send(
            &app,
            Request::post("/api/v1/auth/sign-out")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let screen = json_body(send(&app, get_with("/Users", &cookie)).await).await;
        assert_eq!(screen["state"], "signed_out");
    }

    #[tokio::test]
    async fn test_live_profile_sends_current_record_first() {
        let app = app();
        let cookie = student_cookie(&app).await;
        send(
            &app,
            profile_form(
                &[("name", "Asha"), ("branch", "CSE"), ("cgpa", "8.5")],
                Some(("resume.pdf", b"%PDF")),
                &cookie,
            ),
        )
        .await;

        let response = send(&app, get_with("/api/v1/profile/live", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let mut frames = response.into_body().into_data_stream();
        let first = frames.next().await.unwrap().unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.starts_with("event: record"));
        assert!(text.contains("\"name\":\"Asha\""));
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let app = app();

        let response = send(&app, Request::get("/Admin").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let student = student_cookie(&app).await;
        let response = send(&app, get_with("/Admin", &student)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(
            &app,
            post_json(
                "/api/v1/auth/admin",
                json!({"email": "prof@college.edu", "password": "secret"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(
            &app,
            post_json(
                "/api/v1/auth/admin",
                json!({"email": "dean@college.edu", "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_session_cannot_submit_a_profile() {
        let app = app();
        let admin = admin_cookie(&app).await;

        let response = send(
            &app,
            profile_form(
                &[("name", "Dean"), ("branch", "CSE"), ("cgpa", "9.9")],
                Some(("cv.pdf", b"%PDF")),
                &admin,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let view = json_body(send(&app, get_with("/Admin", &admin)).await).await;
        assert_eq!(view["total_loaded"], 0);
    }

    #[tokio::test]
    async fn test_admin_dashboard_and_export() {
        let app = app();
        let student = student_cookie(&app).await;
        send(
            &app,
            profile_form(
                &[("name", "Asha"), ("branch", "CSE"), ("cgpa", "8.5")],
                Some(("resume.pdf", b"%PDF")),
                &student,
            ),
        )
        .await;

        let admin = admin_cookie(&app).await;
        let view = json_body(send(&app, get_with("/Admin?search=ASHA&page_size=5", &admin)).await).await;
        assert_eq!(view["total_loaded"], 1);
        assert_eq!(view["total_filtered"], 1);
        assert_eq!(view["page_size"], 5);
        assert_eq!(view["rows"][0]["name"], "Asha");
        assert_eq!(view["rows"][0]["id"], "u1");
        assert_eq!(view["rows"][0]["id"], view["rows"][0]["uid"]);

        let view = json_body(send(&app, get_with("/Admin?search=nobody", &admin)).await).await;
        assert_eq!(view["total_filtered"], 0);
        assert_eq!(view["rows"].as_array().unwrap().len(), 0);

        let response = send(&app, get_with("/api/v1/admin/export", &admin)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"students_data.xlsx\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_export_with_no_records() {
        let app = app();
        let admin = admin_cookie(&app).await;
        let response = send(&app, get_with("/api/v1/admin/export", &admin)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_rejects_unknown_page_size() {
        let app = app();
        let admin = admin_cookie(&app).await;
        let response = send(&app, get_with("/Admin?page_size=7", &admin)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
