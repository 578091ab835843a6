//! Scripted transport and fixtures for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::sync::Semaphore;

use common::{ClientError, ClientResult, Credential, Role};

use crate::gateway::{ApiRequest, ApiResponse, Transport};

type Reply = ClientResult<ApiResponse>;

/// In-memory transport answering from per-route scripts
///
/// Each route keeps a queue of replies; the last reply is repeated once the
/// queue is down to one entry. Unscripted routes answer 404. Calls are
/// recorded before any hold, so in-flight requests are counted.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<ApiRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

fn route(method: &Method, path: &str) -> String {
    format!("{} {}", method, path)
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let reply = Ok(ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: serde_json::to_vec(&body).unwrap(),
        });
        self.push(route(&method, path), reply);
    }

    pub fn fail(&self, method: Method, path: &str, err: ClientError) {
        self.push(route(&method, path), Err(err));
    }

    fn push(&self, key: String, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(reply);
    }

    /// Hold every subsequent reply until [`FakeTransport::release`] is called
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held replies through
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Stop holding new replies; already held ones wait on the returned gate
    pub fn unhold(&self) -> Option<Arc<Semaphore>> {
        self.gate.lock().unwrap().take()
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let key = route(&request.method, &request.path);
        self.calls.lock().unwrap().push(request);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Ok(ApiResponse {
                status: StatusCode::NOT_FOUND,
                body: br#"{"detail":"Not Found"}"#.to_vec(),
            }),
        }
    }
}

pub fn credential(role: Role, token: &str) -> Credential {
    Credential {
        token: token.to_string(),
        role,
        display_name: format!("{} User", role),
        must_change_password: false,
    }
}

pub fn teacher_credential() -> Credential {
    credential(Role::Teacher, "teacher-token")
}

pub fn student_credential() -> Credential {
    credential(Role::Student, "student-token")
}
