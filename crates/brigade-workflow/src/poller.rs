//! Completion tracking for supplier calls by bounded polling.

use std::sync::Arc;
use std::time::Duration;

use brigade_core::WorkflowId;
use tracing::{debug, info, warn};

use crate::api::SupplierOrderApi;
use crate::error::{Result, WorkflowError};
use crate::types::{SupplierOrderRequest, WorkflowInstance};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Pause between two status fetches of the same order.
    pub interval: Duration,
    /// Budget used by [`WorkflowPoller::track_default`].
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

pub struct WorkflowPoller {
    api: Arc<dyn SupplierOrderApi>,
    config: PollerConfig,
}

impl WorkflowPoller {
    pub fn new(api: Arc<dyn SupplierOrderApi>, config: PollerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Create the order server-side and return its id.
    #[tracing::instrument(skip_all, fields(supplier = %order.supplier.name))]
    pub async fn submit(&self, order: &SupplierOrderRequest) -> Result<WorkflowId> {
        order.validate()?;
        let created = self.api.create_order(order).await?;
        info!(order_id = %created.order_id, "supplier call initiated");
        Ok(created.order_id)
    }

    /// Poll `id` until it reaches a terminal status.
    ///
    /// `on_update` sees every fetched instance, terminal or not. Fails with
    /// [`WorkflowError::Timeout`] after `max_attempts` non-terminal fetches
    /// (0 counts as 1). A fetch error ends tracking immediately.
    #[tracing::instrument(skip_all, fields(order_id = %id, max_attempts = max_attempts))]
    pub async fn track<F>(
        &self,
        id: &WorkflowId,
        mut on_update: F,
        max_attempts: u32,
    ) -> Result<WorkflowInstance>
    where
        F: FnMut(&WorkflowInstance) + Send,
    {
        let budget = max_attempts.max(1);
        let mut attempts = 0u32;

        loop {
            let instance = self.api.fetch_order(id).await?;
            on_update(&instance);

            if instance.is_terminal() {
                info!(status = %instance.status, attempts = attempts + 1, "supplier call finished");
                return Ok(instance);
            }

            attempts += 1;
            if attempts >= budget {
                warn!(attempts, "supplier call still running, giving up");
                return Err(WorkflowError::Timeout {
                    id: id.clone(),
                    attempts,
                });
            }

            debug!(status = %instance.status, attempts, "supplier call in progress");
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// [`track`](Self::track) with the configured attempt budget.
    pub async fn track_default<F>(&self, id: &WorkflowId, on_update: F) -> Result<WorkflowInstance>
    where
        F: FnMut(&WorkflowInstance) + Send,
    {
        self.track(id, on_update, self.config.max_attempts).await
    }

    /// Submit, then track with the configured budget.
    pub async fn submit_and_track<F>(
        &self,
        order: &SupplierOrderRequest,
        on_update: F,
    ) -> Result<WorkflowInstance>
    where
        F: FnMut(&WorkflowInstance) + Send,
    {
        let id = self.submit(order).await?;
        self.track_default(&id, on_update).await
    }
}
