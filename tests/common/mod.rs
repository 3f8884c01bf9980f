#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use skylab::http::{HttpRequest, HttpResponse};
use skylab::{
    Diagnostic, DiagnosticEvent, DiagnosticObserver, ErrorCode, HttpClient, Result, SkylabError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub const API_KEY: &str = "client-test-key-abc123";

/// What the scripted transport does for one request.
pub enum Step {
    Body(String),
    Status(u16, String),
    Fail,
    Delayed(Duration, String),
    Gated {
        entered: oneshot::Sender<()>,
        release: oneshot::Receiver<()>,
        body: String,
    },
}

impl Step {
    pub fn body(body: &str) -> Self {
        Step::Body(body.to_string())
    }
}

/// A step that blocks until released, plus its handles: a receiver that
/// resolves once the request is in flight and a sender that lets it finish.
pub fn gated(body: &str) -> (Step, oneshot::Receiver<()>, oneshot::Sender<()>) {
    let (entered_tx, entered_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    let step = Step::Gated {
        entered: entered_tx,
        release: release_rx,
        body: body.to_string(),
    };
    (step, entered_rx, release_tx)
}

/// Replays queued steps in order. An empty queue fails like a refused
/// connection.
#[derive(Default)]
pub struct ScriptedHttpClient {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_steps(steps: Vec<Step>) -> Arc<Self> {
        let client = Self::default();
        client.steps.lock().extend(steps);
        Arc::new(client)
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);
        let step = self.steps.lock().pop_front();

        match step {
            Some(Step::Body(body)) => Ok(HttpResponse::new(200, body)),
            Some(Step::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Step::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse::new(200, body))
            }
            Some(Step::Gated {
                entered,
                release,
                body,
            }) => {
                let _ = entered.send(());
                let _ = release.await;
                Ok(HttpResponse::new(200, body))
            }
            Some(Step::Fail) | None => Err(SkylabError::network_error(
                ErrorCode::NetworkError,
                "connection refused",
            )),
        }
    }
}

/// Collects every diagnostic the client emits.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl DiagnosticObserver for RecordingObserver {
    fn on_event(&self, diagnostic: &Diagnostic) {
        self.events.lock().push(diagnostic.event.clone());
    }
}

/// Decode the context segment of a GET vardata URL.
pub fn decoded_context(request: &HttpRequest) -> serde_json::Value {
    let path = request.url.split('?').next().unwrap_or_default();
    let encoded = path.rsplit('/').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD.decode(encoded).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
