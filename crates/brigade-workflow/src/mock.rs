//! Scripted [`SupplierOrderApi`] for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use brigade_core::WorkflowId;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::api::SupplierOrderApi;
use crate::error::{Result, WorkflowError};
use crate::types::{CreatedOrder, SupplierOrderRequest, WorkflowInstance, WorkflowStatus};

/// Replays scripted statuses for `fetch_order`, then repeats the fallback
/// status if one is set.
pub struct MockOrderApi {
    statuses: Mutex<VecDeque<std::result::Result<WorkflowStatus, String>>>,
    fallback: Option<WorkflowStatus>,
    create_error: Option<String>,
    fetches: Mutex<Vec<Instant>>,
    created: Mutex<Vec<SupplierOrderRequest>>,
}

impl MockOrderApi {
    pub fn new(statuses: impl IntoIterator<Item = WorkflowStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().map(Ok).collect()),
            fallback: None,
            create_error: None,
            fetches: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch reports `status`.
    pub fn always(status: WorkflowStatus) -> Self {
        Self {
            fallback: Some(status),
            ..Self::new([])
        }
    }

    /// Queue a fetch failure after the statuses already scripted.
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.statuses.lock().push_back(Err(reason.into()));
        self
    }

    /// Make `create_order` fail with `reason`.
    pub fn failing_create(mut self, reason: impl Into<String>) -> Self {
        self.create_error = Some(reason.into());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().clone()
    }

    pub fn created(&self) -> Vec<SupplierOrderRequest> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl SupplierOrderApi for MockOrderApi {
    async fn create_order(&self, order: &SupplierOrderRequest) -> Result<CreatedOrder> {
        if let Some(reason) = &self.create_error {
            return Err(WorkflowError::Submission(reason.clone()));
        }
        self.created.lock().push(order.clone());
        Ok(CreatedOrder {
            order_id: WorkflowId::from_raw("order_mock"),
            status: Some(WorkflowStatus::Pending),
            call_sid: None,
            message: None,
        })
    }

    async fn fetch_order(&self, id: &WorkflowId) -> Result<WorkflowInstance> {
        self.fetches.lock().push(Instant::now());
        let next = self.statuses.lock().pop_front();
        let status = match next {
            Some(Ok(status)) => status,
            Some(Err(reason)) => return Err(WorkflowError::PollFetch(reason)),
            None => self
                .fallback
                .ok_or_else(|| WorkflowError::PollFetch("no scripted response".into()))?,
        };
        Ok(WorkflowInstance {
            id: id.clone(),
            status,
            ingredients: Vec::new(),
            delivery: None,
            supplier_response: None,
        })
    }
}
