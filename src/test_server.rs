//! Throwaway HTTP server for exercising the clients.
//!
//! Answers each request with the next canned `(status, body)` pair and
//! records what it received.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone, Default)]
struct Canned {
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct TestServer {
    port: u16,
    canned: Canned,
}

async fn respond(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    canned.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_owned(),
        headers,
        body,
    });

    let (status, body) = canned
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, String::new()));

    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

impl TestServer {
    pub async fn start(responses: Vec<(StatusCode, String)>) -> Self {
        let canned = Canned {
            responses: Arc::new(Mutex::new(responses.into())),
            ..Default::default()
        };
        let app = Router::new()
            .fallback(respond)
            .with_state(canned.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { port, canned }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.canned.requests.lock().unwrap().clone()
    }
}
