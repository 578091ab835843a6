//! HTTP gateway for the attendance service
//!
//! Every outbound call goes through [`Gateway`], which attaches the current
//! bearer token and reacts to a 401 by clearing the credential store. The
//! gateway does not distinguish an expired token from one lacking the scope a
//! route needs: any 401 signs the user out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use common::{ClientConfig, ClientError, ClientResult, CredentialStore};

/// Body of an outbound request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Outbound request as handed to a transport
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

/// Raw response as returned by a transport
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Moves requests over the wire
///
/// Transports report only failures to reach the service; HTTP statuses are
/// interpreted by the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

/// Transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the configured service
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Configuration(format!("Invalid HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await.map_err(|e| {
            error!("{} {} failed: {}", request.method, request.path, e);
            ClientError::Network(format!("Unable to reach the attendance service: {}", e))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!("Failed to read response body for {}: {}", request.path, e);
            ClientError::Network(format!("Connection dropped while reading response: {}", e))
        })?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Callback run once when a 401 clears the credential
pub type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Credential-aware gateway shared by every client component
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    on_logout: Option<LogoutHook>,
}

impl Gateway {
    /// Create a new gateway
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            on_logout: None,
        }
    }

    /// Run `hook` whenever a 401 actually signs the user out
    pub fn with_logout_hook(mut self, hook: LogoutHook) -> Self {
        self.on_logout = Some(hook);
        self
    }

    /// Credential store the gateway reads tokens from
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute(Method::GET, path, RequestBody::Empty).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute(Method::POST, path, RequestBody::Empty).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = serde_json::to_value(body)?;
        self.execute(Method::POST, path, RequestBody::Json(value))
            .await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> ClientResult<T> {
        let fields = fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self.execute(Method::POST, path, RequestBody::Form(fields))
            .await
    }

    /// POST without a body, ignoring whatever the service answers on success
    pub async fn post_ack(&self, path: &str) -> ClientResult<()> {
        self.dispatch(Method::POST, path, RequestBody::Empty)
            .await
            .map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<T> {
        let response = self.dispatch(method, path, body).await?;

        serde_json::from_slice(&response.body).map_err(|e| {
            error!("Failed to decode response from {}: {}", path, e);
            ClientError::Decode(e.to_string())
        })
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<ApiResponse> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: self.store.token(),
        };
        debug!("{} {}", request.method, request.path);

        let response = self.transport.send(request).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            self.force_logout(path);
            return Err(ClientError::Unauthorized);
        }

        if !response.status.is_success() {
            let err = remote_error(&response);
            warn!("{} answered {}: {}", path, response.status.as_u16(), err);
            return Err(err);
        }

        Ok(response)
    }

    fn force_logout(&self, path: &str) {
        if self.store.logout() {
            warn!("{} answered 401, signing out", path);
            if let Some(hook) = &self.on_logout {
                hook();
            }
        } else {
            debug!("{} answered 401 with no credential held", path);
        }
    }
}

fn remote_error(response: &ApiResponse) -> ClientError {
    let detail = serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_string)
        });

    ClientError::Remote {
        status: response.status.as_u16(),
        message: detail.unwrap_or_else(|| {
            format!("Request failed with status {}", response.status.as_u16())
        }),
    }
}
