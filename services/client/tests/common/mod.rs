//! services/client/tests/common/mod.rs
//!
//! A small in-process backend the integration tests run against. It models
//! the parts of the real API the client cares about: cookie-based access
//! tokens with a generation counter (bumping the generation invalidates
//! every cookie already handed out), a deliberately slow refresh endpoint so
//! concurrent 401s pile up behind one refresh, and scriptable chat/studio
//! payloads.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use client_lib::{Config, SopClient};

pub struct Backend {
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub chat_list_calls: AtomicUsize,
    pub studio_list_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,

    pub refresh_succeeds: AtomicBool,
    /// Refresh reports success but hands back a cookie from the previous
    /// generation, so the replay still 401s.
    pub refresh_mints_stale: AtomicBool,
    pub otp_rate_limited: AtomicBool,
    pub decline_generate: AtomicBool,
    /// Status for POST /api/chat/: 200, 409 or 500.
    pub create_status: AtomicUsize,
    /// The studio list turns non-empty on this call number; 0 means never.
    pub studio_ready_after: AtomicUsize,

    generation: AtomicUsize,
    listed_chats: Mutex<Vec<Value>>,
}

impl Backend {
    fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            chat_list_calls: AtomicUsize::new(0),
            studio_list_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            refresh_succeeds: AtomicBool::new(true),
            refresh_mints_stale: AtomicBool::new(false),
            otp_rate_limited: AtomicBool::new(false),
            decline_generate: AtomicBool::new(false),
            create_status: AtomicUsize::new(200),
            studio_ready_after: AtomicUsize::new(0),
            generation: AtomicUsize::new(1),
            listed_chats: Mutex::new(Vec::new()),
        }
    }

    /// Invalidates every access cookie issued so far.
    pub fn expire_access(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_chat_list(&self, chats: Vec<Value>) {
        *self.listed_chats.lock().unwrap() = chats;
    }

    fn current_cookie(&self) -> String {
        format!("access=g{}; Path=/", self.generation.load(Ordering::SeqCst))
    }

    fn stale_cookie(&self) -> String {
        format!(
            "access=g{}; Path=/",
            self.generation.load(Ordering::SeqCst) - 1
        )
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("access=g{}", self.generation.load(Ordering::SeqCst));
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|cookies| cookies.contains(&expected))
            .unwrap_or(false)
    }
}

pub struct MockBackend {
    pub state: Arc<Backend>,
    pub base_url: String,
}

impl MockBackend {
    /// A client wired against this backend, with poll settings short enough
    /// for tests.
    pub fn client(&self) -> SopClient {
        SopClient::new(Config {
            api_url: self.base_url.clone(),
            chat_api_url: self.base_url.clone(),
            studio_poll_interval: Duration::from_millis(25),
            studio_poll_attempts: 5,
        })
        .unwrap()
    }
}

pub async fn spawn_backend() -> MockBackend {
    init_tracing();
    let state = Arc::new(Backend::new());
    let app = router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockBackend {
        state,
        base_url: format!("http://{addr}"),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn user_json() -> Value {
    json!({
        "_id": "u1",
        "fullname": "Ana Ruiz",
        "email": "ana@example.com",
        "avatar": null,
        "lastLogin": "2026-08-01T09:00:00Z",
        "isEmailVerified": true
    })
}

fn router(state: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/send-otp", post(send_otp))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/refresh-token", post(refresh))
        .route("/api/profile/", get(get_profile).patch(update_profile))
        .route("/api/profile/upload", post(upload_avatar))
        .route(
            "/api/chat/",
            post(create_chat)
                .get(list_chats)
                .patch(update_chat)
                .delete(delete_chat),
        )
        .route("/api/chat/rename", patch(rename_chat))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/upload", post(upload_pdfs))
        .route("/api/chat/pdfs/{chat_id}", get(chat_pdfs))
        .route("/api/chat/all-pdfs", get(all_pdfs))
        .route("/api/chat/boom", get(boom))
        .route("/api/studio/generate", post(studio_generate))
        .route("/api/studio/{chat_id}", get(studio_list))
        .route("/api/studio/{chat_id}/{tool_id}", delete(studio_delete))
        .with_state(state)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Access token required" })),
    )
        .into_response()
}

//=========================================================================================
// Auth Handlers
//=========================================================================================

async fn login(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    if body["password"] == "wrong" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, b.current_cookie())],
        Json(json!({ "user": user_json() })),
    )
        .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Email is required" })),
        )
            .into_response();
    }
    Json(json!({ "success": true, "message": "OTP sent" })).into_response()
}

async fn send_otp(State(b): State<Arc<Backend>>) -> Response {
    if b.otp_rate_limited.load(Ordering::SeqCst) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "message": "Please wait before requesting another OTP",
                "remainingCooldown": 17
            })),
        )
            .into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn verify_otp(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    if body["otp"] != "123456" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid OTP" })),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, b.current_cookie())],
        Json(json!({ "user": user_json() })),
    )
        .into_response()
}

async fn logout() -> Response {
    (
        [(header::SET_COOKIE, "access=; Path=/; Max-Age=0".to_string())],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn refresh(State(b): State<Arc<Backend>>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Slow on purpose: concurrent 401s must queue behind this.
    tokio::time::sleep(Duration::from_millis(150)).await;

    if !b.refresh_succeeds.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Refresh token expired" })),
        )
            .into_response();
    }
    let cookie = if b.refresh_mints_stale.load(Ordering::SeqCst) {
        b.stale_cookie()
    } else {
        b.current_cookie()
    };
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn get_profile(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.profile_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "user": user_json() })).into_response()
}

async fn update_profile(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let mut user = user_json();
    if let Some(fullname) = body.get("fullname") {
        user["fullname"] = fullname.clone();
    }
    if let Some(email) = body.get("email") {
        user["email"] = email.clone();
    }
    Json(json!({ "user": user })).into_response()
}

async fn upload_avatar(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let mut file_name = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("avatar") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Expected an avatar field" })),
            )
                .into_response();
        }
        file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        if bytes.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Empty upload" })),
            )
                .into_response();
        }
    }
    let Some(file_name) = file_name else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "No avatar file" })),
        )
            .into_response();
    };
    let mut user = user_json();
    user["avatar"] = json!(format!("/uploads/{file_name}"));
    Json(json!({ "user": user })).into_response()
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

async fn create_chat(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    match b.create_status.load(Ordering::SeqCst) {
        409 => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Chat already exists" })),
        )
            .into_response(),
        500 => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database unavailable" })),
        )
            .into_response(),
        _ => Json(json!({
            "chat": {
                "_id": body["chatId"],
                "title": body["title"],
                "pdfIds": [],
                "messages": [],
                "createdAt": "2026-03-01T10:00:00Z",
                "updatedAt": "2026-03-01T10:00:00Z"
            }
        }))
        .into_response(),
    }
}

async fn list_chats(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.chat_list_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let chats = b.listed_chats.lock().unwrap().clone();
    Json(json!({ "chats": chats })).into_response()
}

async fn update_chat(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "chat": {
            "_id": body["chatId"],
            "title": body.get("title").cloned().unwrap_or(json!("New Chat")),
            "pdfIds": [],
            "messages": [],
            "createdAt": "2026-03-01T10:00:00Z",
            "updatedAt": "2026-03-01T11:00:00Z"
        }
    }))
    .into_response()
}

async fn rename_chat(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    if body.get("chatId").and_then(Value::as_str).is_none()
        || body.get("title").and_then(Value::as_str).is_none()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "chatId and title are required" })),
        )
            .into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn delete_chat(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    if body.get("chatId").and_then(Value::as_str).is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "chatId is required" })),
        )
            .into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn send_message(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    if body.get("chatId").and_then(Value::as_str).is_none()
        || body.get("question").and_then(Value::as_str).is_none()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "chatId and question are required" })),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "answer": {
            "intent": "procedure",
            "blocks": [
                {
                    "type": "answer",
                    "text": "Refunds go through the returns desk."
                },
                {
                    "type": "steps",
                    "title": "Refund steps",
                    "steps": [
                        { "step": 1, "text": "Open the order" },
                        { "step": 2, "text": "Verify the receipt" },
                        { "step": 3, "text": "Issue the refund" }
                    ]
                }
            ],
            "confidence": 0.9
        },
        "citations": [{
            "id": "cit-1",
            "documentName": "policy.pdf",
            "pageNumber": 12,
            "sectionTitle": "Refunds"
        }]
    }))
    .into_response()
}

async fn upload_pdfs(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let mut chat_id = None;
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("pdfs") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.unwrap();
                if bytes.is_empty() {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "message": "Empty upload" })),
                    )
                        .into_response();
                }
                names.push(name);
            }
            Some("chatId") => chat_id = Some(field.text().await.unwrap()),
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "Unexpected multipart field" })),
                )
                    .into_response();
            }
        }
    }
    if chat_id.is_none() || names.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "chatId and pdfs are required" })),
        )
            .into_response();
    }
    let files: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "id": format!("pdf-{i}"), "name": name, "status": "processing" }))
        .collect();
    Json(json!({ "files": files })).into_response()
}

async fn chat_pdfs(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(_chat_id): Path<String>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "pdfs": [{ "_id": "pdf-0", "pdfName": "policy.pdf" }]
    }))
    .into_response()
}

async fn all_pdfs(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "pdfs": [{
            "_id": "pdf-0",
            "pdfName": "policy.pdf",
            "createdAt": "2026-02-10T08:30:00Z",
            "pdfPages": "42",
            "pdfSize": 102400
        }]
    }))
    .into_response()
}

async fn boom() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response()
}

//=========================================================================================
// Studio Handlers
//=========================================================================================

async fn studio_generate(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    b.generate_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorized(&headers) {
        return unauthorized();
    }
    if body.get("chatId").and_then(Value::as_str).is_none()
        || body.get("toolId").and_then(Value::as_str).is_none()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "chatId and toolId are required" })),
        )
            .into_response();
    }
    if b.decline_generate.load(Ordering::SeqCst) {
        return Json(json!({ "success": false })).into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn studio_list(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(_chat_id): Path<String>,
) -> Response {
    let call = b.studio_list_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let ready_after = b.studio_ready_after.load(Ordering::SeqCst);
    if ready_after != 0 && call >= ready_after {
        Json(json!([{
            "toolId": "quiz",
            "content": { "questions": ["What is the first refund step?"] }
        }]))
        .into_response()
    } else {
        Json(json!([])).into_response()
    }
}

async fn studio_delete(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path((_chat_id, _tool_id)): Path<(String, String)>,
) -> Response {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "success": true })).into_response()
}
