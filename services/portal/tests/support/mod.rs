//! In-process stand-in for the attendance service

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const SESSION_ID: i64 = 42;
pub const TEACHER: &str = "teacher@uni.edu";
pub const STUDENT: &str = "student@uni.edu";
pub const PASSWORD: &str = "correct horse";

#[derive(Default)]
pub struct FakeService {
    /// Active session per offering
    sessions: Mutex<HashMap<i64, i64>>,
    ledger: Mutex<Vec<Value>>,
    revoked: AtomicBool,
    fail_capture: AtomicBool,
    enrolled_samples: AtomicUsize,
    capture_calls: AtomicUsize,
    requests: AtomicUsize,
}

impl FakeService {
    /// Answer 401 to every authenticated route from now on
    pub fn revoke_tokens(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    pub fn fail_capture(&self, fail: bool) {
        self.fail_capture.store(fail, Ordering::SeqCst);
    }

    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<String, Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        match token {
            Some(token) if !self.revoked.load(Ordering::SeqCst) => Ok(token),
            _ => Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
        }
    }
}

type Shared = Arc<FakeService>;

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn session(id: i64, offering: i64, active: bool) -> Value {
    let end_time = (!active).then_some("2025-03-04T10:00:00");
    json!({
        "id": id,
        "course_offering_id": offering,
        "start_time": "2025-03-04T09:00:00",
        "end_time": end_time,
        "active": active,
    })
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    scope: Option<String>,
}

async fn login(State(service): State<Shared>, Form(form): Form<LoginForm>) -> Response {
    service.requests.fetch_add(1, Ordering::SeqCst);
    let role = match form.username.as_str() {
        TEACHER => "TEACHER",
        STUDENT => "STUDENT",
        _ => return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    };
    if form.password != PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    }
    if form.scope.is_none() {
        return detail(StatusCode::BAD_REQUEST, "Scope is required");
    }

    Json(json!({
        "access_token": format!("token-{}", role.to_lowercase()),
        "token_type": "bearer",
        "role": role,
        "must_change_password": false,
        "full_name": "Ada Lovelace",
    }))
    .into_response()
}

async fn active_session(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(offering): Path<i64>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    match service.sessions.lock().unwrap().get(&offering) {
        Some(id) => Json(session(*id, offering, true)).into_response(),
        None => detail(StatusCode::NOT_FOUND, "No active session"),
    }
}

#[derive(Deserialize)]
struct StartRequest {
    course_offering_id: i64,
}

async fn start_session(
    State(service): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<StartRequest>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    let offering = request.course_offering_id;
    service.sessions.lock().unwrap().insert(offering, SESSION_ID);
    Json(session(SESSION_ID, offering, true)).into_response()
}

async fn end_session(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(session_id): Path<i64>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    let mut sessions = service.sessions.lock().unwrap();
    let Some(offering) = sessions
        .iter()
        .find(|(_, id)| **id == session_id)
        .map(|(offering, _)| *offering)
    else {
        return detail(StatusCode::NOT_FOUND, "Session not found");
    };
    sessions.remove(&offering);
    Json(session(session_id, offering, false)).into_response()
}

async fn ledger(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(_offering): Path<i64>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    Json(Value::Array(service.ledger.lock().unwrap().clone())).into_response()
}

#[derive(Deserialize)]
struct VerifyRequest {
    image_data: String,
}

async fn verify_face(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(session_id): Path<i64>,
    Json(request): Json<VerifyRequest>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    if !service.sessions.lock().unwrap().values().any(|id| *id == session_id) {
        return detail(StatusCode::BAD_REQUEST, "Session is not active");
    }
    if !request.image_data.starts_with("data:image/jpeg;base64,") {
        return detail(StatusCode::BAD_REQUEST, "Invalid image data");
    }

    service.ledger.lock().unwrap().push(json!({
        "student_id": "S1",
        "student_name": "Sam Student",
        "status": "PRESENT",
        "detected_at": "2025-03-04T09:15:30",
        "confidence": 0.91,
    }));
    Json(json!({
        "matched": true,
        "student_id": "S1",
        "student_name": "Sam Student",
        "confidence": 0.91,
        "message": "Attendance logged via face verification.",
    }))
    .into_response()
}

#[derive(Deserialize)]
struct CaptureRequest {
    images: Vec<String>,
}

async fn capture(
    State(service): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<CaptureRequest>,
) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    service.capture_calls.fetch_add(1, Ordering::SeqCst);
    if service.fail_capture.load(Ordering::SeqCst) {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "Face service unavailable");
    }
    service
        .enrolled_samples
        .store(request.images.len(), Ordering::SeqCst);
    Json(json!({
        "message": "Face samples stored.",
        "samples": request.images.len(),
        "status": "STORED",
    }))
    .into_response()
}

async fn my_face(State(service): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = service.authorize(&headers) {
        return denied;
    }
    let samples = service.enrolled_samples.load(Ordering::SeqCst);
    Json(json!({ "enrolled": samples > 0, "samples": samples })).into_response()
}

fn router(service: Shared) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/teacher/attendance/active/:id", get(active_session))
        .route("/teacher/attendance/start", post(start_session))
        .route("/teacher/attendance/:id/end", post(end_session))
        .route("/teacher/attendance/:id", get(ledger))
        .route("/attendance/:session/verify-face", post(verify_face))
        .route("/faces/capture", post(capture))
        .route("/faces/me", get(my_face))
        .with_state(service)
}

/// Serve the fake service on an ephemeral port and return its base URL
pub async fn spawn() -> (Shared, String) {
    let service = Shared::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(service.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (service, format!("http://{}", addr))
}
