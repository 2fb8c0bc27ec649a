use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

use crate::models::{ContactResponse, ErrorBody, Message};

pub const FALLBACK_ERROR: &str = "Something went wrong!";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}")]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
}

impl ClientError {
    /// Text shown in the error notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => FALLBACK_ERROR.to_string(),
        }
    }
}

/// Posts contact messages to the `/api/contact` endpoint.
#[derive(Debug, Clone)]
pub struct ContactClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ContactClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one JSON request holding `email`, `name` and `message`.
    ///
    /// Any 2xx counts as delivered. The parsed body is `None` when the server
    /// did not answer with the usual `{message, outgoingMessage}` JSON.
    pub async fn send(&self, message: &Message) -> Result<Option<ContactResponse>, ClientError> {
        let response = self.http.post(&self.endpoint).json(message).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(match serde_json::from_slice::<ContactResponse>(&body) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(%status, error = %e, "unexpected body on accepted contact message");
                    None
                }
            });
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.message)
            .filter(|m| !m.is_empty());
        Err(ClientError::Rejected { status, message })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;
    use crate::contact::CONTACT_PATH;

    #[derive(Clone, Default)]
    struct Recorder {
        hits: Arc<AtomicUsize>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    async fn recording_server(recorder: Recorder) -> String {
        let app = Router::new().route(
            CONTACT_PATH,
            post(move |Json(body): Json<Value>| async move {
                recorder.hits.fetch_add(1, Ordering::SeqCst);
                recorder.bodies.lock().unwrap().push(body.clone());
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "message": "Successfully stored message!",
                        "outgoingMessage": body,
                    })),
                )
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}{CONTACT_PATH}")
    }

    #[tokio::test]
    async fn one_request_with_exactly_the_three_fields() {
        let recorder = Recorder::default();
        let endpoint = recording_server(recorder.clone()).await;

        let response = ContactClient::new(endpoint)
            .send(&Message::new("a@b.com", "Jo", "Hello there"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.message, "Successfully stored message!");

        assert_eq!(recorder.hits.load(Ordering::SeqCst), 1);
        let bodies = recorder.bodies.lock().unwrap();
        let body = bodies[0].as_object().unwrap();
        let mut keys: Vec<_> = body.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["email", "message", "name"]);
        assert!(!body.contains_key("_id"));
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["name"], "Jo");
        assert_eq!(body["message"], "Hello there");
    }

    #[tokio::test]
    async fn rejection_carries_server_message() {
        let app = Router::new().route(
            CONTACT_PATH,
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "Invalid input."})),
                )
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = ContactClient::new(format!("http://{addr}{CONTACT_PATH}"))
            .send(&Message::new("a@b.com", "Jo", "Hello there"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Rejected { status, .. } if status == StatusCode::UNPROCESSABLE_ENTITY
        ));
        assert_eq!(err.user_message(), "Invalid input.");
    }
}
