use axum::response::Html;

const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Resume Collector</title></head>
<body>
  <h1>Resume Collector</h1>
  <p>Choose your login option</p>
  <ul>
    <li><a href="/Users">Login as Student</a></li>
    <li><a href="/Admin">Login as Teacher</a></li>
  </ul>
</body>
</html>
"#;

/// GET /
pub async fn landing_handler() -> Html<&'static str> {
    Html(LANDING_PAGE)
}
