use academy_core::{GalleryItem, Notice, Roadmap};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod admin;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use session::{Clock, ManualClock, Session, SessionStore, SystemClock};
pub use state::{AdminCredentials, AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub async fn create_app(state: AppState) -> Router {
    let state = Arc::new(state);
    let cors = CorsLayer::permissive();
    let uploads = ServeDir::new(state.uploads_dir());
    let uploads_prefix = state.uploads_prefix().to_string();

    let admin_routes = Router::new()
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/session", get(admin::current_session))
        .route("/api/admin/notices", post(handlers::create::<Notice>))
        .route(
            "/api/admin/notices/:id",
            put(handlers::update::<Notice>).delete(handlers::delete::<Notice>),
        )
        .route("/api/admin/gallery", post(handlers::create::<GalleryItem>))
        .route(
            "/api/admin/gallery/:id",
            put(handlers::update::<GalleryItem>).delete(handlers::delete::<GalleryItem>),
        )
        .route("/api/admin/roadmaps", post(handlers::create::<Roadmap>))
        .route(
            "/api/admin/roadmaps/:id",
            put(handlers::update::<Roadmap>).delete(handlers::delete::<Roadmap>),
        )
        .route("/api/admin/admissions/:level", post(handlers::create_admission))
        .route(
            "/api/admin/admissions/:level/:id",
            put(handlers::update_admission).delete(handlers::delete_admission),
        )
        .route("/api/admin/upload", post(admin::upload))
        .route("/api/direct-scrape", post(admin::direct_scrape))
        .route("/api/admin/scrape-middle-school", post(admin::scrape_middle_school))
        .route("/api/admin/scrape-high-school", post(admin::scrape_high_school))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .route("/api/notices", get(handlers::list::<Notice>))
        .route("/api/notices/:id", get(handlers::get::<Notice>))
        .route("/api/notices/:id/view", post(handlers::record_view::<Notice>))
        .route("/api/gallery", get(handlers::list::<GalleryItem>))
        .route("/api/gallery/:id", get(handlers::get::<GalleryItem>))
        .route("/api/roadmaps", get(handlers::list::<Roadmap>))
        .route("/api/roadmaps/:id", get(handlers::get::<Roadmap>))
        .route("/api/admissions/:level", get(handlers::list_admissions))
        .route("/api/admissions/:level/:id", get(handlers::get_admission))
        .route("/api/admissions/:level/:id/view", post(handlers::view_admission))
        .route("/api/admin/login", post(admin::login))
        .merge(admin_routes)
        .nest_service(&uploads_prefix, uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub mod prelude {
    pub use academy_core::{Error, Result};
    pub use crate::{create_app, AdminCredentials, AppState, SessionStore};
}
