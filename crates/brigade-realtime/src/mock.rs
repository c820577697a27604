//! Scripted [`Connector`] for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, SinkExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::PollSender;

use crate::transport::{Channel, Connector, TransportError};

enum Outcome {
    Fail,
    Pending,
    Open(Channel),
}

/// A connector that replays a script of outcomes. Once the script runs out,
/// every attempt fails.
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next attempt fails immediately.
    pub fn push_failure(&self) {
        self.script.lock().push_back(Outcome::Fail);
    }

    /// Next attempt never completes.
    pub fn push_pending(&self) {
        self.script.lock().push_back(Outcome::Pending);
    }

    /// Next attempt opens a channel driven by the returned [`MockRemote`].
    pub fn push_channel(&self) -> MockRemote {
        let (to_client, from_remote) = mpsc::channel::<Result<String, TransportError>>(64);
        let (to_remote, from_client) = mpsc::channel::<String>(64);

        let stream = stream::unfold(from_remote, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let sink = PollSender::new(to_remote).sink_map_err(|_| TransportError::Closed);

        self.script.lock().push_back(Outcome::Open(Channel {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }));
        MockRemote {
            to_client: Some(to_client),
            from_client,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Instants at which each connect attempt started.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Channel, TransportError> {
        self.attempts.lock().push(Instant::now());
        let next = self.script.lock().pop_front();
        match next {
            Some(Outcome::Open(channel)) => Ok(channel),
            Some(Outcome::Pending) => futures::future::pending().await,
            Some(Outcome::Fail) | None => Err(TransportError::Connect {
                url: url.to_owned(),
                reason: "connection refused".into(),
            }),
        }
    }
}

/// Server side of a mock channel.
pub struct MockRemote {
    to_client: Option<mpsc::Sender<Result<String, TransportError>>>,
    from_client: mpsc::Receiver<String>,
}

impl MockRemote {
    /// Deliver a text frame to the client. Returns `false` once the client is gone.
    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Ok(text.into())).await.is_ok(),
            None => false,
        }
    }

    /// Fail the client's read side.
    pub async fn send_error(&self, reason: &str) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Err(TransportError::Read(reason.into()))).await.is_ok(),
            None => false,
        }
    }

    /// Close the channel from the server side.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Next frame written by the client, or `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}
