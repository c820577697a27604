use brigade_core::WorkflowId;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The creation request failed; nothing is being tracked.
    #[error("order submission failed: {0}")]
    Submission(String),

    /// A status fetch failed. Not retried.
    #[error("order status fetch failed: {0}")]
    PollFetch(String),

    /// The call is still running after the attempt budget. The server side
    /// may yet finish.
    #[error("supplier call {id} is taking too long ({attempts} status checks)")]
    Timeout { id: WorkflowId, attempts: u32 },

    #[error("http client setup failed: {0}")]
    Client(String),
}

impl WorkflowError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
