//! REST boundary for supplier orders.

use std::time::Duration;

use async_trait::async_trait;
use brigade_core::WorkflowId;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::types::{CreatedOrder, SupplierOrderRequest, WorkflowInstance};

#[async_trait]
pub trait SupplierOrderApi: Send + Sync {
    /// Create the order and start the supplier call.
    async fn create_order(&self, order: &SupplierOrderRequest) -> Result<CreatedOrder>;

    /// Current state of one order.
    async fn fetch_order(&self, id: &WorkflowId) -> Result<WorkflowInstance>;
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: WorkflowInstance,
}

/// `reqwest` client for `/api/supplier-orders`.
#[derive(Clone, Debug)]
pub struct HttpSupplierOrderApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSupplierOrderApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| WorkflowError::Client(e.to_string()))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// `/api/supplier-orders` under the base url, plus `id` as one escaped segment.
    fn endpoint(&self, id: Option<&WorkflowId>) -> std::result::Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid base url {}: {e}", self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| format!("base url {} cannot carry a path", self.base_url))?;
            segments.pop_if_empty().extend(["api", "supplier-orders"]);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl SupplierOrderApi for HttpSupplierOrderApi {
    #[tracing::instrument(skip_all, fields(supplier = %order.supplier.name))]
    async fn create_order(&self, order: &SupplierOrderRequest) -> Result<CreatedOrder> {
        let url = self.endpoint(None).map_err(WorkflowError::Submission)?;
        let resp = self
            .request(Method::POST, url)
            .json(order)
            .send()
            .await
            .map_err(|e| WorkflowError::Submission(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WorkflowError::Submission(e.to_string()))?;
        if !status.is_success() {
            return Err(WorkflowError::Submission(failure_message(
                &body,
                status,
                "order creation failed",
            )));
        }

        let created: CreatedOrder = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::Submission(format!("unexpected response: {e}")))?;
        debug!(order_id = %created.order_id, "order created");
        Ok(created)
    }

    #[tracing::instrument(skip_all, fields(order_id = %id))]
    async fn fetch_order(&self, id: &WorkflowId) -> Result<WorkflowInstance> {
        let url = self.endpoint(Some(id)).map_err(WorkflowError::PollFetch)?;
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| WorkflowError::PollFetch(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WorkflowError::PollFetch(e.to_string()))?;
        if !status.is_success() {
            return Err(WorkflowError::PollFetch(failure_message(
                &body,
                status,
                "order fetch failed",
            )));
        }

        let envelope: OrderEnvelope = serde_json::from_str(&body)
            .map_err(|e| WorkflowError::PollFetch(format!("unexpected response: {e}")))?;
        Ok(envelope.order)
    }
}

/// Server-provided `message` (or `error`), else a generic line with the status.
fn failure_message(body: &str, status: StatusCode, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| format!("{fallback} (HTTP {})", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ingredient, Supplier, WorkflowStatus};
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpSupplierOrderApi {
        HttpSupplierOrderApi::new(server.uri(), Some("k-123".into()), Duration::from_secs(5))
            .unwrap()
    }

    fn order() -> SupplierOrderRequest {
        SupplierOrderRequest {
            supplier: Supplier {
                id: "s1".into(),
                name: "Primeur Dupont".into(),
                phone: "+33600000000".into(),
                email: Some("contact@dupont.fr".into()),
            },
            ingredients: vec![Ingredient {
                name: "tomates".into(),
                quantity: 5.0,
                unit: "kg".into(),
            }],
        }
    }

    #[tokio::test]
    async fn create_order_posts_french_body_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/supplier-orders"))
            .and(header("x-api-key", "k-123"))
            .and(body_json(json!({
                "fournisseur": {
                    "id": "s1",
                    "nom": "Primeur Dupont",
                    "telephone": "+33600000000",
                    "email": "contact@dupont.fr"
                },
                "ingredients": [{"nom": "tomates", "quantite": 5.0, "unite": "kg"}]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "orderId": "65f0c1",
                "callSid": "CA1",
                "message": "Appel en cours d'initiation"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = api(&server).create_order(&order()).await.unwrap();
        assert_eq!(created.order_id.as_str(), "65f0c1");
        assert_eq!(created.call_sid.as_deref(), Some("CA1"));
        assert_eq!(created.status, None);
    }

    #[tokio::test]
    async fn create_order_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Fournisseur inconnu"})),
            )
            .mount(&server)
            .await;

        let err = api(&server).create_order(&order()).await.unwrap_err();
        assert_matches!(err, WorkflowError::Submission(msg) if msg == "Fournisseur inconnu");
    }

    #[tokio::test]
    async fn create_order_falls_back_to_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Configuration Twilio manquante"
            })))
            .mount(&server)
            .await;

        let err = api(&server).create_order(&order()).await.unwrap_err();
        assert_matches!(err, WorkflowError::Submission(msg) if msg == "Configuration Twilio manquante");
    }

    #[tokio::test]
    async fn create_order_without_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = api(&server).create_order(&order()).await.unwrap_err();
        assert_matches!(err, WorkflowError::Submission(msg) if msg.contains("502"));
    }

    #[tokio::test]
    async fn fetch_order_decodes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/supplier-orders/65f0c1"))
            .and(header("x-api-key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "order": {
                    "_id": "65f0c1",
                    "statut": "confirmee",
                    "ingredients": [{"nom": "tomates", "quantite": 5, "unite": "kg"}],
                    "livraison": {"date": "2026-10-15T00:00:00.000Z", "heure": "07:30"},
                    "reponse_fournisseur": {"accepte": true, "prix_total": 42.5, "delai_livraison": "demain"}
                }
            })))
            .mount(&server)
            .await;

        let instance = api(&server)
            .fetch_order(&WorkflowId::from_raw("65f0c1"))
            .await
            .unwrap();
        assert_eq!(instance.status, WorkflowStatus::Confirmed);
        let response = instance.supplier_response.unwrap();
        assert_eq!(response.accepted, Some(true));
        assert_eq!(response.total_price, Some(42.5));
    }

    #[tokio::test]
    async fn fetch_order_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": "Commande non trouvée"
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .fetch_order(&WorkflowId::from_raw("nope"))
            .await
            .unwrap_err();
        assert_matches!(err, WorkflowError::PollFetch(msg) if msg == "Commande non trouvée");
    }

    #[tokio::test]
    async fn fetch_order_unknown_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "order": {"_id": "65f0c1", "statut": "annulee"}
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .fetch_order(&WorkflowId::from_raw("65f0c1"))
            .await
            .unwrap_err();
        assert_matches!(err, WorkflowError::PollFetch(_));
    }

    #[tokio::test]
    async fn no_api_key_header_when_unset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "k-123"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "order": {"_id": "a", "statut": "en_attente"}
            })))
            .mount(&server)
            .await;

        let api = HttpSupplierOrderApi::with_client(reqwest::Client::new(), server.uri(), None);
        let instance = api.fetch_order(&WorkflowId::from_raw("a")).await.unwrap();
        assert_eq!(instance.status, WorkflowStatus::Pending);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let api = HttpSupplierOrderApi::with_client(
            reqwest::Client::new(),
            "http://localhost:8080/",
            None,
        );
        assert_eq!(api.base_url, "http://localhost:8080");
        assert_eq!(
            api.endpoint(None).unwrap().as_str(),
            "http://localhost:8080/api/supplier-orders"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let api = HttpSupplierOrderApi::with_client(
            reqwest::Client::new(),
            "http://kitchen.local/backend/",
            None,
        );
        let url = api.endpoint(Some(&WorkflowId::from_raw("65f0c1"))).unwrap();
        assert_eq!(url.path(), "/backend/api/supplier-orders/65f0c1");
    }

    #[tokio::test]
    async fn fetch_order_escapes_id_as_single_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/supplier-orders/a%2Fb%3Fx=1%23frag"))
            .and(query_param_is_missing("x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "order": {"_id": "a/b?x=1#frag", "statut": "appel_en_cours"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let instance = api(&server)
            .fetch_order(&WorkflowId::from_raw("a/b?x=1#frag"))
            .await
            .unwrap();
        assert_eq!(instance.status, WorkflowStatus::Calling);
    }

    #[tokio::test]
    async fn unusable_base_url_fails_before_sending() {
        let api = HttpSupplierOrderApi::with_client(reqwest::Client::new(), "not a url", None);
        let err = api
            .fetch_order(&WorkflowId::from_raw("o1"))
            .await
            .unwrap_err();
        assert_matches!(err, WorkflowError::PollFetch(msg) if msg.contains("invalid base url"));
        let err = api.create_order(&order()).await.unwrap_err();
        assert_matches!(err, WorkflowError::Submission(_));
    }
}
