//! In-memory [`MessageStore`] for session tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::store::{
    Message, MessageStore, ReviewRequest, ReviewResponse, RunStatus, RuntimeState,
    StartTransformRequest, StartTransformResponse,
};

#[derive(Debug, Default)]
struct State {
    runtime: Option<RuntimeState>,
    messages: Vec<Message>,
    fail_fetches: bool,
    fail_reviews: bool,
    reviews: Vec<ReviewRequest>,
}

#[derive(Debug, Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn running() -> Self {
        let store = Self::default();
        store.set_runtime(RuntimeState::Running);
        store
    }

    pub fn set_runtime(&self, runtime: RuntimeState) {
        self.state.lock().unwrap().runtime = Some(runtime);
    }

    pub fn push(&self, message: Message) {
        self.state.lock().unwrap().messages.push(message);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetches = fail;
    }

    pub fn fail_reviews(&self, fail: bool) {
        self.state.lock().unwrap().fail_reviews = fail;
    }

    pub fn reviews(&self) -> Vec<ReviewRequest> {
        self.state.lock().unwrap().reviews.clone()
    }

    fn unavailable(endpoint: &str) -> TransportError {
        TransportError::Status {
            endpoint: endpoint.to_string(),
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn start_transform(
        &self,
        request: &StartTransformRequest,
    ) -> Result<StartTransformResponse, TransportError> {
        Ok(StartTransformResponse {
            instance_id: "run-1".to_string(),
            client_id: request.client_id.clone(),
        })
    }

    async fn status(&self, instance_id: &str) -> Result<RunStatus, TransportError> {
        let state = self.state.lock().unwrap();
        if state.fail_fetches {
            return Err(Self::unavailable("/status"));
        }
        Ok(RunStatus {
            instance_id: instance_id.to_string(),
            runtime_status: state.runtime,
            custom_status: serde_json::Value::Null,
            output: serde_json::Value::Null,
            created_time: None,
            last_updated_time: None,
        })
    }

    async fn messages(&self, _instance_id: &str) -> Result<Vec<Message>, TransportError> {
        let state = self.state.lock().unwrap();
        if state.fail_fetches {
            return Err(Self::unavailable("/messages"));
        }
        Ok(state.messages.clone())
    }

    async fn submit_review(
        &self,
        _instance_id: &str,
        request: &ReviewRequest,
    ) -> Result<ReviewResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reviews {
            return Err(Self::unavailable("/review"));
        }
        state.reviews.push(request.clone());
        Ok(ReviewResponse {
            status: "review_submitted".to_string(),
            approved: request.approved,
        })
    }
}
