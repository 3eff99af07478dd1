use academy_core::SchoolLevel;
use academy_scraper::{ImportReport, RunOptions};
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mime_guess::mime::{self, Mime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::session_cookie;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.admin.verify(&request.username, &request.password) {
        tracing::warn!("Rejected admin login for {}", request.username);
        return Err(ApiError::new(
            axum::http::StatusCode::UNAUTHORIZED,
            "아이디 또는 비밀번호가 올바르지 않습니다.",
        ));
    }

    let session = state.sessions.create(&request.username).await;
    tracing::info!("Admin {} logged in", session.user);
    let cookie = session_cookie(&session.token, state.sessions.ttl().num_seconds());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            token: session.token,
            user: session.user,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    state.sessions.revoke(&session.token).await;
    (
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(serde_json::json!({ "success": true })),
    )
}

pub async fn current_session(Extension(session): Extension<Session>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "authenticated": true,
        "user": session.user,
        "expiresAt": session.expires_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

/// Stores the first file field of a multipart form in the uploads directory.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("잘못된 업로드 요청입니다: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let extension = upload_extension(&file_name, content_type.as_deref())
            .ok_or_else(|| ApiError::bad_request("이미지 파일만 업로드할 수 있습니다."))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("파일을 읽을 수 없습니다: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("빈 파일은 업로드할 수 없습니다."));
        }

        let filename = format!("upload_{}.{}", Uuid::new_v4().simple(), extension);
        tokio::fs::create_dir_all(state.uploads_dir())
            .await
            .map_err(academy_core::Error::from)?;
        tokio::fs::write(state.uploads_dir().join(&filename), &bytes)
            .await
            .map_err(academy_core::Error::from)?;

        tracing::info!("📁 Stored upload {} as {}", file_name, filename);
        return Ok(Json(UploadResponse {
            success: true,
            url: format!("{}/{}", state.uploads_prefix(), filename),
        }));
    }

    Err(ApiError::bad_request("업로드할 파일이 없습니다."))
}

/// Raster image extension of `file_name`. SVG is refused since it can carry scripts.
fn upload_extension(file_name: &str, content_type: Option<&str>) -> Option<String> {
    let is_raster = |m: &Mime| m.type_() == mime::IMAGE && m.subtype() != mime::SVG;

    if let Some(ct) = content_type {
        let declared = ct.parse::<Mime>().ok()?;
        if !is_raster(&declared) && declared.essence_str() != mime::APPLICATION_OCTET_STREAM.essence_str() {
            return None;
        }
    }
    let guessed = mime_guess::from_path(file_name).first()?;
    if !is_raster(&guessed) {
        return None;
    }
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeRequest {
    /// Only honoured by the direct trigger; both levels run when absent.
    pub level: Option<SchoolLevel>,
    pub clear_existing: bool,
}

/// A trigger may be posted without a body. A body that is sent must be a valid `ScrapeRequest`.
fn scrape_request(body: Result<Json<ScrapeRequest>, JsonRejection>) -> ApiResult<ScrapeRequest> {
    match body {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ScrapeRequest::default()),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

async fn run_import(state: &AppState, level: SchoolLevel, clear_existing: bool) -> ImportReport {
    let outcome = state
        .scraper
        .run(level, RunOptions { clear_existing })
        .await;
    let report = ImportReport::from(outcome);
    tracing::info!("Import for {} finished: {}", level, report.message);
    report
}

pub async fn scrape_middle_school(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<ImportReport>> {
    let request = scrape_request(body)?;
    Ok(Json(run_import(&state, SchoolLevel::Middle, request.clear_existing).await))
}

pub async fn scrape_high_school(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<ImportReport>> {
    let request = scrape_request(body)?;
    Ok(Json(run_import(&state, SchoolLevel::High, request.clear_existing).await))
}

pub async fn direct_scrape(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<ImportReport>> {
    let request = scrape_request(body)?;
    let levels = match request.level {
        Some(level) => vec![level],
        None => SchoolLevel::ALL.to_vec(),
    };

    let mut reports = Vec::new();
    for level in levels {
        reports.push(run_import(&state, level, request.clear_existing).await);
    }
    Ok(Json(combine_reports(reports)))
}

fn combine_reports(reports: Vec<ImportReport>) -> ImportReport {
    ImportReport {
        success: reports.iter().any(|r| r.success),
        count: reports.iter().map(|r| r.count).sum(),
        message: reports
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join(" / "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("poster.PNG", Some("image/png")).as_deref(), Some("png"));
        assert_eq!(upload_extension("photo.jpeg", None).as_deref(), Some("jpeg"));
        assert_eq!(upload_extension("scan.webp", Some("application/octet-stream")).as_deref(), Some("webp"));
        assert_eq!(upload_extension("logo.svg", Some("image/svg+xml")), None);
        assert_eq!(upload_extension("notes.txt", Some("text/plain")), None);
        assert_eq!(upload_extension("script.js", Some("image/png")), None);
        assert_eq!(upload_extension("noext", Some("image/png")), None);
    }

    #[test]
    fn test_combine_reports() {
        let combined = combine_reports(vec![
            ImportReport {
                success: true,
                message: "a".to_string(),
                count: 2,
            },
            ImportReport {
                success: false,
                message: "b".to_string(),
                count: 0,
            },
        ]);
        assert!(combined.success);
        assert_eq!(combined.count, 2);
        assert_eq!(combined.message, "a / b");
    }
}
