//! HTTP request handlers for the scan service

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Form, Multipart, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use scan_common::{Diagnosis, Error as ScanError};
use scan_inference::{predict_tumor, ModelLoader};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    auth::{self, CurrentUser},
    config::{Config, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_TTL_SECS},
    media::MediaStore,
    models::{
        IndexResponse, LoginForm, RecordResponse, RecordView, SignupForm, UploadResponse, User,
    },
    pages,
    storage::Store,
};

/// Number of records shown on the index page
pub const RECENT_LIMIT: usize = 5;

/// Multipart field carrying the scan
pub const UPLOAD_FIELD: &str = "mri_image";

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ModelLoader>,
    pub media: MediaStore,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: ModelLoader, media: MediaStore) -> Self {
        Self {
            store,
            model: Arc::new(model),
            media,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Self {
        Self {
            session_ttl_secs: config.session_ttl_secs,
            max_upload_bytes: config.max_upload_bytes,
            ..Self::new(
                store,
                ModelLoader::new(&config.model_path),
                MediaStore::new(&config.media_root),
            )
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<ScanError>() {
            Some(ScanError::AlreadyClassified(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// Run CPU-bound work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::from(anyhow::anyhow!("Blocking task failed: {}", e)))
}

/// Redirect to the index, attaching a `Set-Cookie` header
fn redirect_with_cookie(cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "scan-service"
    }))
}

/// Most recent scans, newest first
pub async fn index_handler(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndexResponse>, ApiError> {
    info!("Listing recent scans for {}", user.username);

    let records = state.store.list_recent(RECENT_LIMIT).await?;
    let images = records.iter().map(RecordView::from).collect();

    Ok(Json(IndexResponse { images }))
}

/// Store an uploaded scan, classify it and return the diagnosis
pub async fn upload_handler(
    user: CurrentUser,
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // A plain form post carries no file at all
    let Ok(mut multipart) = multipart else {
        return Ok(Redirect::to("/").into_response());
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            continue;
        }
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        info!("Upload from {} without a scan, redirecting", user.username);
        return Ok(Redirect::to("/").into_response());
    };

    info!("Received scan {} ({} bytes) from {}", file_name, bytes.len(), user.username);

    let image = state.media.save(&file_name, &bytes).await?;
    let record = state.store.create_record(&image).await?;

    let loader = Arc::clone(&state.model);
    let path = state.media.path_of(&image);
    let diagnosis = tokio::task::spawn_blocking(move || predict_tumor(&loader, &path))
        .await
        .unwrap_or_else(|e| {
            error!("Prediction task for record {} failed: {}", record.id, e);
            Diagnosis::prediction_error()
        });

    let record = state
        .store
        .record_diagnosis(record.id, &diagnosis)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Record {} disappeared during classification", record.id))?;

    info!("Record {} classified: {}", record.id, record);

    Ok(Json(UploadResponse {
        prediction: diagnosis.label,
        probability: diagnosis.percentage(),
        image_url: MediaStore::url_of(&record.image),
        record: RecordView::from(&record),
    })
    .into_response())
}

/// A single scan by id
pub async fn record_handler(
    _user: CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<RecordResponse>, ApiError> {
    match state.store.get_record(id).await? {
        Some(record) => Ok(Json(RecordResponse {
            record: RecordView::from(&record),
        })),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("Record not found: {}", id),
        }),
    }
}

pub async fn signup_page() -> Html<&'static str> {
    Html(pages::SIGNUP_PAGE)
}

pub async fn login_page() -> Html<&'static str> {
    Html(pages::LOGIN_PAGE)
}

/// Register a user and log them in
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignupForm>,
) -> Result<Response, ApiError> {
    auth::validate_username(&form.username)?;
    auth::validate_new_password(&form.password1, &form.password2)?;

    let password = form.password1;
    let password_hash = blocking(move || auth::hash_password(&password)).await??;
    let user = User::new(form.username, password_hash);

    if !state.store.create_user(&user).await? {
        return Err(ApiError::bad_request(
            "A user with that username already exists.",
        ));
    }

    info!("Signed up user: {}", user.username);
    start_session(&state, &user.username).await
}

/// Check credentials and start a session
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let user = state.store.get_user(&form.username).await?;

    let verified = match user {
        Some(user) => {
            let password = form.password;
            blocking(move || auth::verify_password(&password, &user.password_hash)).await?
        }
        None => false,
    };

    if !verified {
        warn!("Failed login for: {}", form.username);
        return Err(ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: "Please enter a correct username and password.".to_string(),
        });
    }

    info!("Logged in: {}", form.username);
    start_session(&state, &form.username).await
}

/// End the session and clear the cookie
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = auth::session_token(&headers) {
        state.store.delete_session(&token).await?;
        info!("Logged out session");
    }

    Ok(redirect_with_cookie(auth::clear_session_cookie()))
}

async fn start_session(state: &AppState, username: &str) -> Result<Response, ApiError> {
    let token = auth::new_session_token()?;
    state
        .store
        .create_session(&token, username, state.session_ttl_secs)
        .await?;

    Ok(redirect_with_cookie(auth::session_cookie(
        &token,
        state.session_ttl_secs,
    )))
}
