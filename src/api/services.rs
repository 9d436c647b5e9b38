//! Demo handlers showing how a host reads the decoded form.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};

use super::{
    models::{FormSummary, HealthResponse, UploadSummary},
    state::AppState,
};
use crate::form::NestedTree;
use crate::middleware::FormContext;

const UPLOAD_PAGE: &str = r#"<!doctype html>
<html>
  <body>
    <p>Title, image and a nested field</p>
    <form method="post" enctype="multipart/form-data">
      <p><input type="text" name="title" placeholder="Title"></p>
      <p><input type="text" name="user[name]" placeholder="Name"></p>
      <p><input type="file" name="image" multiple></p>
      <p><input type="submit" value="Upload"></p>
    </form>
  </body>
</html>
"#;

/// `GET /` serves a small upload form.
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// `POST /` summarizes what was uploaded.
pub async fn upload_summary(form: FormContext) -> impl IntoResponse {
    let uploads: Vec<UploadSummary> = form.files.files().into_iter().map(Into::into).collect();
    let total_bytes = uploads.iter().map(|upload| upload.size).sum();
    let fields = match &form.body {
        NestedTree::Mapping(map) => map.len(),
        _ => 0,
    };

    Json(FormSummary {
        fields,
        uploads,
        total_bytes,
    })
}

/// `POST /body` echoes the decoded field tree.
pub async fn echo_body(form: FormContext) -> Json<NestedTree> {
    Json(form.body)
}

/// `POST /files` echoes the decoded file tree.
pub async fn echo_files(form: FormContext) -> Json<NestedTree> {
    Json(form.files)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
