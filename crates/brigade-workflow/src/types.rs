//! REST payloads. Field names on the wire are French; Rust names are not.

use std::fmt;
use std::str::FromStr;

use brigade_core::WorkflowId;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    #[serde(rename = "en_attente")]
    Pending,
    #[serde(rename = "appel_en_cours")]
    Calling,
    #[serde(rename = "confirmee")]
    Confirmed,
    #[serde(rename = "refusee")]
    Declined,
    #[serde(rename = "erreur")]
    Error,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Declined | Self::Error)
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Pending => "en_attente",
            Self::Calling => "appel_en_cours",
            Self::Confirmed => "confirmee",
            Self::Declined => "refusee",
            Self::Error => "erreur",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Calling => "calling",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Error => "error",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "quantite")]
    pub quantity: f64,
    #[serde(rename = "unite")]
    pub unit: String,
}

/// Parses `name:quantity:unit`, e.g. `tomates:5:kg`.
impl FromStr for Ingredient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(unit), Some(quantity), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected name:quantity:unit, got {s:?}"));
        };
        let quantity: f64 = quantity
            .trim()
            .parse()
            .map_err(|_| format!("invalid quantity {quantity:?}"))?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(format!("quantity must be non-negative, got {quantity}"));
        }
        let (name, unit) = (name.trim(), unit.trim());
        if name.is_empty() || unit.is_empty() {
            return Err(format!("expected name:quantity:unit, got {s:?}"));
        }
        Ok(Self {
            name: name.to_owned(),
            quantity,
            unit: unit.to_owned(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "heure", default)]
    pub time: Option<String>,
    #[serde(rename = "commentaire", default)]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierResponse {
    #[serde(rename = "accepte", default)]
    pub accepted: Option<bool>,
    #[serde(rename = "prix_total", default)]
    pub total_price: Option<f64>,
    #[serde(rename = "delai_livraison", default)]
    pub delivery_delay: Option<String>,
    /// Decline reason when not accepted.
    #[serde(rename = "commentaire", default)]
    pub comment: Option<String>,
}

/// One tracked supplier call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    #[serde(rename = "_id", alias = "id")]
    pub id: WorkflowId,
    #[serde(rename = "statut")]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(rename = "livraison", default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryInfo>,
    #[serde(
        rename = "reponse_fournisseur",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub supplier_response: Option<SupplierResponse>,
}

impl WorkflowInstance {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn decline_reason(&self) -> Option<&str> {
        if self.status != WorkflowStatus::Declined {
            return None;
        }
        self.supplier_response.as_ref()?.comment.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body of the order-creation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierOrderRequest {
    #[serde(rename = "fournisseur")]
    pub supplier: Supplier,
    pub ingredients: Vec<Ingredient>,
}

impl SupplierOrderRequest {
    /// Reject orders the server would refuse.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.supplier.phone.trim().is_empty() {
            return Err(WorkflowError::Submission("supplier phone number is missing".into()));
        }
        if self.ingredients.is_empty() {
            return Err(WorkflowError::Submission("ingredient list is empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrder {
    #[serde(rename = "orderId")]
    pub order_id: WorkflowId,
    #[serde(rename = "statut", default)]
    pub status: Option<WorkflowStatus>,
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
