use academy_core::{
    Admission, AdmissionPatch, GalleryItem, ListQuery, NewAdmission, Notice, Page, Record,
    Repository, Roadmap, SchoolLevel, Storage,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// A record type served under its own set of routes.
pub trait Collection: Record {
    /// Used in error messages.
    const LABEL: &'static str;

    fn repository(storage: &Storage) -> Arc<dyn Repository<Self>>;
}

impl Collection for Notice {
    const LABEL: &'static str = "공지사항";

    fn repository(storage: &Storage) -> Arc<dyn Repository<Self>> {
        storage.notices.clone()
    }
}

impl Collection for GalleryItem {
    const LABEL: &'static str = "갤러리 항목";

    fn repository(storage: &Storage) -> Arc<dyn Repository<Self>> {
        storage.gallery.clone()
    }
}

impl Collection for Roadmap {
    const LABEL: &'static str = "로드맵";

    fn repository(storage: &Storage) -> Arc<dyn Repository<Self>> {
        storage.roadmaps.clone()
    }
}

pub async fn list<T: Collection>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<T>>> {
    Ok(Json(T::repository(&state.storage).list(&query).await?))
}

pub async fn get<T: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<T>> {
    T::repository(&state.storage)
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::LABEL))
}

pub async fn record_view<T: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<T>> {
    T::repository(&state.storage)
        .record_view(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::LABEL))
}

pub async fn create<T: Collection>(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<T::Draft>,
) -> ApiResult<(StatusCode, Json<T>)>
where
    T::Draft: DeserializeOwned,
{
    let record = T::repository(&state.storage).create(draft).await?;
    tracing::info!("Created {} #{}", T::LABEL, record.id());
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<T: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<T::Patch>,
) -> ApiResult<Json<T>>
where
    T::Patch: DeserializeOwned,
{
    T::repository(&state.storage)
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::LABEL))
}

pub async fn delete<T: Collection>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if T::repository(&state.storage).delete(id).await? {
        tracing::info!("Deleted {} #{}", T::LABEL, id);
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::not_found(T::LABEL))
    }
}

const ADMISSION: &str = "입시 정보";

pub async fn list_admissions(
    State(state): State<Arc<AppState>>,
    Path(level): Path<SchoolLevel>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<Admission>>> {
    Ok(Json(state.storage.admissions(level).list(&query).await?))
}

pub async fn get_admission(
    State(state): State<Arc<AppState>>,
    Path((level, id)): Path<(SchoolLevel, i64)>,
) -> ApiResult<Json<Admission>> {
    state
        .storage
        .admissions(level)
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ADMISSION))
}

pub async fn view_admission(
    State(state): State<Arc<AppState>>,
    Path((level, id)): Path<(SchoolLevel, i64)>,
) -> ApiResult<Json<Admission>> {
    state
        .storage
        .admissions(level)
        .record_view(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ADMISSION))
}

pub async fn create_admission(
    State(state): State<Arc<AppState>>,
    Path(level): Path<SchoolLevel>,
    Json(draft): Json<NewAdmission>,
) -> ApiResult<(StatusCode, Json<Admission>)> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::bad_request("제목을 입력하세요."));
    }
    let admission = state.storage.admissions(level).create(draft).await?;
    tracing::info!("Created {} admission #{}", level, admission.id);
    Ok((StatusCode::CREATED, Json(admission)))
}

pub async fn update_admission(
    State(state): State<Arc<AppState>>,
    Path((level, id)): Path<(SchoolLevel, i64)>,
    Json(patch): Json<AdmissionPatch>,
) -> ApiResult<Json<Admission>> {
    state
        .storage
        .admissions(level)
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ADMISSION))
}

pub async fn delete_admission(
    State(state): State<Arc<AppState>>,
    Path((level, id)): Path<(SchoolLevel, i64)>,
) -> ApiResult<Json<Value>> {
    if state.storage.admissions(level).delete(id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::not_found(ADMISSION))
    }
}
