use crate::config::Config;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// A single source file in an execution request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PistonFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

/// Execution request in the shape the Piston API expects.
///
/// The HTTP handler forwards bodies verbatim; this type is for callers that
/// build requests in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PistonRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<PistonFile>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl PistonRequest {
    pub fn single_file(language: &str, version: &str, source: &str) -> Self {
        Self {
            language: language.to_string(),
            version: version.to_string(),
            files: vec![PistonFile {
                name: None,
                content: source.to_string(),
            }],
            stdin: String::new(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExecuteError {
    /// The upstream answered with a non-2xx status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Network failure or an unreadable upstream body.
    #[error("{0}")]
    Transport(String),

    /// The incoming request body was not valid JSON.
    #[error("{0}")]
    InvalidBody(String),
}

impl ExecuteError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExecuteError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ExecuteError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExecuteError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for ExecuteError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorBody {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Thin client for the third-party code execution API.
#[derive(Debug, Clone)]
pub struct ExecuteClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ExecuteClient {
    pub fn new(url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.piston_api_url, config.piston_api_key.clone())
    }

    /// Forward an execution request and return the upstream JSON unchanged.
    ///
    /// No retries: runs are user-triggered and the user can run again.
    pub async fn execute(&self, body: &Value) -> Result<Value, ExecuteError> {
        let mut request = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(body);

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExecuteError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExecuteError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("Piston API error: {}", status.as_u16()));
            return Err(ExecuteError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ExecuteError::Transport(e.to_string()))
    }

    /// Typed convenience over [`execute`](Self::execute).
    pub async fn run(&self, request: &PistonRequest) -> Result<Value, ExecuteError> {
        let body = serde_json::to_value(request).map_err(|e| ExecuteError::InvalidBody(e.to_string()))?;
        self.execute(&body).await
    }
}

/// `POST /api/execute-code`
pub async fn execute_code(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ExecuteError> {
    let Json(body) = body.map_err(|e| ExecuteError::InvalidBody(e.body_text()))?;

    let language = body.get("language").and_then(Value::as_str).unwrap_or("unknown");
    info!("Executing code (language: {})", language);

    match state.executor.execute(&body).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!("Code execution failed ({}): {}", e.status(), e);
            Err(e)
        }
    }
}
