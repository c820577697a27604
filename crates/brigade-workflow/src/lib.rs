//! Supplier-order workflow: submit an order, then poll the supplier call
//! until it reaches a terminal status.

pub mod api;
pub mod error;
pub mod mock;
pub mod poller;
pub mod types;

pub use api::{HttpSupplierOrderApi, SupplierOrderApi};
pub use error::{Result, WorkflowError};
pub use poller::{PollerConfig, WorkflowPoller};
pub use types::{
    CreatedOrder, DeliveryInfo, Ingredient, Supplier, SupplierOrderRequest, SupplierResponse,
    WorkflowInstance, WorkflowStatus,
};
