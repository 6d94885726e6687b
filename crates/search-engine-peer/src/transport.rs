//! The narrow interface between an [`crate::EnginePeer`] and an actual
//! upstream connection — a production `tonic` client in the coordinator
//! binary, an in-memory stand-in everywhere else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use search_types::EngineResult;

/// Transport-level failure categories. Named after gRPC status codes
/// because the production transport is gRPC, but the taxonomy applies
/// equally to the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("upstream unavailable")]
    Unavailable,
    #[error("call aborted")]
    Aborted,
    #[error("resource exhausted")]
    ResourceExhausted,
    #[error("permission denied")]
    PermissionDenied,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("internal error")]
    Internal,
}

/// An in-memory [`crate::Transport`] returning a fixed result (or error),
/// used by unit tests and the bundled demos in place of a live gRPC
/// connection.
pub struct MockTransport {
    result: EngineResult,
    healthy: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(result: EngineResult) -> Self {
        Self {
            result,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl crate::Transport for MockTransport {
    async fn search(&self, _query: &str, _index: &str, _limit: u32) -> Result<EngineResult, TransportError> {
        Ok(self.result.clone())
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
