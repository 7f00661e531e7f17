//! Loopback receiver for the OAuth redirect
//!
//! A warp server on 127.0.0.1 that answers `GET /callback`. The handler
//! validates `state` against the pending transaction before any token
//! exchange; malformed callbacks never write a token.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::{Filter, Rejection};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("missing authorization code")]
    MissingCode,

    #[error("state does not match the pending connect attempt")]
    StateMismatch,

    #[error("no connect attempt is pending")]
    NoPendingTransaction,

    #[error("client id missing")]
    MissingClientId,

    #[error("token exchange failed: {0}")]
    Exchange(String),
}

impl CallbackError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCode | Self::StateMismatch => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Completes the authorization once a redirect arrives.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    async fn complete_authorization(&self, code: &str, state: &str) -> Result<(), CallbackError>;
}

/// Run the query of one redirect through the handler.
async fn handle_callback(
    params: HashMap<String, String>,
    handler: Arc<dyn CallbackHandler>,
) -> warp::reply::WithStatus<String> {
    let code = params.get("code").map(String::as_str).unwrap_or_default();
    let state = params.get("state").map(String::as_str).unwrap_or_default();

    match handler.complete_authorization(code, state).await {
        Ok(()) => warp::reply::with_status(
            "Connected. You can close this window and return to the app.".to_string(),
            StatusCode::OK,
        ),
        Err(e @ (CallbackError::MissingCode | CallbackError::StateMismatch)) => {
            tracing::warn!("Rejected OAuth callback: {}", e);
            warp::reply::with_status(
                "Invalid state or missing code. You can close this window.".to_string(),
                e.status_code(),
            )
        }
        Err(e) => {
            tracing::warn!("OAuth callback failed: {}", e);
            warp::reply::with_status(format!("Error: {}", e), e.status_code())
        }
    }
}

/// `GET /callback?code=..&state=..`; every other route is rejected by warp.
pub fn routes(
    handler: Arc<dyn CallbackHandler>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let handler = warp::any().map(move || Arc::clone(&handler));

    warp::path("callback")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(handler)
        .then(handle_callback)
}

/// Running loopback listener. Stops when dropped.
pub struct CallbackServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind 127.0.0.1:`port` (0 picks a free port) and serve until dropped.
    pub fn start(port: u16, handler: Arc<dyn CallbackHandler>) -> Result<Self, warp::Error> {
        let (addr, server) =
            warp::serve(routes(handler)).try_bind_ephemeral(([127, 0, 0, 1], port))?;
        tracing::info!("OAuth callback listening on {}", addr);

        let task = tokio::spawn(server);
        Ok(Self { addr, task })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallbackHandler for Recorder {
        async fn complete_authorization(&self, code: &str, state: &str) -> Result<(), CallbackError> {
            self.calls
                .lock()
                .unwrap()
                .push((code.to_string(), state.to_string()));
            if code.is_empty() {
                return Err(CallbackError::MissingCode);
            }
            if state != "expected" {
                return Err(CallbackError::StateMismatch);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_valid_callback() {
        let handler = Arc::new(Recorder::default());
        let response = warp::test::request()
            .path("/callback?code=abc%2B1&state=expected")
            .reply(&routes(handler.clone()))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(handler.calls()[0], ("abc+1".to_string(), "expected".to_string()));
    }

    #[tokio::test]
    async fn test_state_mismatch_and_missing_code_are_400() {
        let handler = Arc::new(Recorder::default());
        let filter = routes(handler.clone());

        let response = warp::test::request()
            .path("/callback?code=abc&state=forged")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(response.body()).contains("Invalid state"));

        let response = warp::test::request()
            .path("/callback?state=expected")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(handler.calls()[1], (String::new(), "expected".to_string()));
    }

    #[tokio::test]
    async fn test_other_routes_never_reach_handler() {
        let handler = Arc::new(Recorder::default());
        let filter = routes(handler.clone());

        let response = warp::test::request()
            .path("/favicon.ico")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = warp::test::request()
            .method("POST")
            .path("/callback?code=c&state=expected")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(handler.calls().is_empty());
    }

    #[test]
    fn test_exchange_failure_is_500() {
        assert_eq!(
            CallbackError::Exchange("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(CallbackError::StateMismatch.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_request_split_across_writes_is_accepted() {
        let handler = Arc::new(Recorder::default());
        let server = CallbackServer::start(0, handler.clone()).unwrap();
        assert_ne!(server.port(), 0);

        let mut stream = TcpStream::connect(("127.0.0.1", server.port())).await.unwrap();
        stream
            .write_all(b"GET /callback?code=abc&state=expec")
            .await
            .unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream
            .write_all(b"ted HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("return to the app."));
        assert_eq!(handler.calls(), vec![("abc".to_string(), "expected".to_string())]);
    }
}
