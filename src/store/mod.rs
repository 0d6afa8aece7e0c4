//! Message Store Adapter.
//!
//! Fetches the ordered message log and run status for a pipeline instance and
//! posts review decisions back. No logic lives here beyond shape validation:
//! anything the orchestrator returns that does not deserialize into the wire
//! types is reported as a [`TransportError`].

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::errors::TransportError;

pub use http::HttpMessageStore;
pub use types::{
    Message, Phase, ReviewRequest, ReviewResponse, Role, RunStatus, RuntimeState,
    StartTransformRequest, StartTransformResponse,
};

/// The orchestrator boundary, as seen by the review console.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// `POST /transform`
    async fn start_transform(
        &self,
        request: &StartTransformRequest,
    ) -> Result<StartTransformResponse, TransportError>;

    /// `GET /transform/{id}/status`
    async fn status(&self, instance_id: &str) -> Result<RunStatus, TransportError>;

    /// `GET /transform/{id}/messages`, in server order.
    async fn messages(&self, instance_id: &str) -> Result<Vec<Message>, TransportError>;

    /// `POST /transform/{id}/review`
    async fn submit_review(
        &self,
        instance_id: &str,
        request: &ReviewRequest,
    ) -> Result<ReviewResponse, TransportError>;
}

/// Fetch status and messages for one instance concurrently.
pub async fn fetch_run(
    store: &dyn MessageStore,
    instance_id: &str,
) -> Result<(RunStatus, Vec<Message>), TransportError> {
    futures::try_join!(store.status(instance_id), store.messages(instance_id))
}
