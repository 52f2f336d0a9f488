//! ============================================================================
//! API Service - Typed endpoint calls
//! ============================================================================
//! `RecommendationApi` and `TransactionSource` are the seams the UI layer
//! talks to. `HttpRecommendationService` implements them over `ApiClient`;
//! the mock backend implements the same traits, so swapping one for the
//! other needs no UI change.
//! ============================================================================

use async_trait::async_trait;
use tracing::info;

use crate::error::ApiError;
use crate::http_client::ApiClient;
use crate::types::{
    RecommendationRequest, RecommendationResponse, TipRequest, TipResponse, TipStatusReport,
    Transaction, TransactionHistory,
};

/// Endpoint paths relative to the API base URL
pub mod endpoints {
    pub const RECOMMEND: &str = "/recommend";
    pub const CLARIFY: &str = "/clarify";
    pub const TIP_INITIATE: &str = "/tip/initiate";
    /// Reserved for the payment gateway; never called by the client
    pub const TIP_CALLBACK: &str = "/tip/callback";
    pub const TIP_STATUS: &str = "/tip/status";
    pub const TIP_HISTORY: &str = "/tip/history";
}

#[async_trait]
pub trait RecommendationApi: Send + Sync {
    async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApiError>;

    async fn clarify_recommendation(
        &self,
        request: &RecommendationRequest,
        session_id: &str,
    ) -> Result<RecommendationResponse, ApiError>;

    async fn initiate_tip(&self, request: &TipRequest) -> Result<TipResponse, ApiError>;

    async fn tip_status(&self, transaction_id: &str) -> Result<TipStatusReport, ApiError>;
}

/// Where the transaction history page gets its rows
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ApiError>;
}

/// REST implementation of the service traits
#[derive(Clone)]
pub struct HttpRecommendationService {
    client: ApiClient,
}

impl HttpRecommendationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// History of tips sent from one phone number
    pub fn history_for(&self, phone_number: &str) -> PhoneHistorySource {
        PhoneHistorySource {
            client: self.client.clone(),
            phone_number: phone_number.trim().to_string(),
        }
    }
}

fn checked(response: RecommendationResponse) -> Result<RecommendationResponse, ApiError> {
    response.validate().map_err(ApiError::InvalidResponse)?;
    Ok(response)
}

#[async_trait]
impl RecommendationApi for HttpRecommendationService {
    async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApiError> {
        let response: RecommendationResponse = self
            .client
            .post_json(endpoints::RECOMMEND, &[], request)
            .await?;
        info!(
            "Recommendations: {} products (session {}, {})",
            response.products.len(),
            response.session_id,
            response.query_type
        );
        checked(response)
    }

    async fn clarify_recommendation(
        &self,
        request: &RecommendationRequest,
        session_id: &str,
    ) -> Result<RecommendationResponse, ApiError> {
        let response: RecommendationResponse = self
            .client
            .post_json(endpoints::CLARIFY, &[("session_id", session_id)], request)
            .await?;
        info!(
            "Clarified session {}: {} products",
            session_id,
            response.products.len()
        );
        checked(response)
    }

    async fn initiate_tip(&self, request: &TipRequest) -> Result<TipResponse, ApiError> {
        let response: TipResponse = self
            .client
            .post_json(endpoints::TIP_INITIATE, &[], request)
            .await?;
        info!("Tip {} initiated: {}", response.transaction_id, response.status);
        Ok(response)
    }

    async fn tip_status(&self, transaction_id: &str) -> Result<TipStatusReport, ApiError> {
        let id = transaction_id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::InvalidRequest(format!(
                "invalid transaction id '{}'",
                transaction_id
            )));
        }
        self.client
            .get_json(&format!("{}/{}", endpoints::TIP_STATUS, id))
            .await
    }
}

/// Transaction history of a single phone number over REST
#[derive(Clone)]
pub struct PhoneHistorySource {
    client: ApiClient,
    phone_number: String,
}

#[async_trait]
impl TransactionSource for PhoneHistorySource {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        if self.phone_number.is_empty() || self.phone_number.contains('/') {
            return Err(ApiError::InvalidRequest(format!(
                "invalid phone number '{}'",
                self.phone_number
            )));
        }
        let history: TransactionHistory = self
            .client
            .get_json(&format!("{}/{}", endpoints::TIP_HISTORY, self.phone_number))
            .await?;
        Ok(history.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::serve_once;
    use crate::types::QueryType;
    use serde_json::json;

    fn service_for(base_url: &str) -> HttpRecommendationService {
        let config = ClientConfig::development().with_base_url(base_url).unwrap();
        HttpRecommendationService::new(ApiClient::new(&config).unwrap())
    }

    fn product_json(url: &str) -> serde_json::Value {
        json!({
            "name": "Premium Laptop Pro",
            "description": "16GB RAM, 512GB SSD",
            "specs": [{ "key": "RAM", "value": "16GB" }],
            "image_url": "https://placehold.co/300x200",
            "price": { "value": 1299.99, "currency": "KES" },
            "vendor_url": url,
            "confidence_score": 0.92
        })
    }

    #[tokio::test]
    async fn test_get_recommendations() {
        let body = json!({
            "products": [product_json("https://example.com/product-1")],
            "session_id": "sess-1",
            "query_type": "feature_based"
        });
        let (base_url, seen) = serve_once(200, body.to_string(), None);

        let response = service_for(&base_url)
            .get_recommendations(&RecommendationRequest::new("Need a good laptop for coding"))
            .await
            .unwrap();
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.query_type, QueryType::FeatureBased);
        assert_eq!(response.products[0].specs[0].key, "RAM");

        let request = seen.recv().unwrap();
        assert_eq!(request.url, "/api/v1/recommend");
    }

    #[tokio::test]
    async fn test_clarify_passes_session_id() {
        let body = json!({
            "products": [],
            "session_id": "test-session-123",
            "query_type": "subjective"
        });
        let (base_url, seen) = serve_once(200, body.to_string(), None);

        let request = RecommendationRequest::new("What's your maximum budget?")
            .with_context("previous_query", json!("I need a cheap phone for my mama"));
        service_for(&base_url)
            .clarify_recommendation(&request, "test-session-123")
            .await
            .unwrap();

        let seen = seen.recv().unwrap();
        assert_eq!(seen.url, "/api/v1/clarify?session_id=test-session-123");
        let body: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body["context"]["previous_query"], "I need a cheap phone for my mama");
    }

    #[tokio::test]
    async fn test_duplicate_vendor_urls_rejected() {
        let body = json!({
            "products": [
                product_json("https://example.com/dup"),
                product_json("https://example.com/dup")
            ],
            "session_id": "s",
            "query_type": "subjective"
        });
        let (base_url, _seen) = serve_once(200, body.to_string(), None);

        let err = service_for(&base_url)
            .get_recommendations(&RecommendationRequest::new("laptop"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_initiate_tip() {
        let body = json!({
            "transaction_id": "TXN_20260101120000",
            "status": "pending",
            "message": "Please check your phone to complete the payment"
        });
        let (base_url, seen) = serve_once(200, body.to_string(), None);

        let response = service_for(&base_url)
            .initiate_tip(&TipRequest {
                phone_number: "+254759325915".into(),
                amount: 100.0,
            })
            .await
            .unwrap();
        assert_eq!(response.status, "pending");

        let seen = seen.recv().unwrap();
        assert_eq!(seen.url, "/api/v1/tip/initiate");
        let body: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body["phone_number"], "+254759325915");
        assert_eq!(body["amount"], 100.0);
    }

    #[tokio::test]
    async fn test_tip_error_detail_surfaces() {
        let body = json!({ "error": "Phone number must be in format: +254XXXXXXXXX" });
        let (base_url, _seen) = serve_once(400, body.to_string(), None);

        let err = service_for(&base_url)
            .initiate_tip(&TipRequest {
                phone_number: "0712".into(),
                amount: 100.0,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server returned 400: Phone number must be in format: +254XXXXXXXXX"
        );
    }

    #[tokio::test]
    async fn test_phone_history() {
        let body = json!({
            "phone_number": "+254759325915",
            "transactions": [{
                "id": "TXN_1",
                "phone_number": "+254759325915",
                "amount": 100.0,
                "status": "completed",
                "created_at": "2026-01-01T12:00:00.123456"
            }]
        });
        let (base_url, seen) = serve_once(200, body.to_string(), None);

        let rows = service_for(&base_url)
            .history_for("+254759325915")
            .fetch_transactions()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].created_at.to_rfc3339(), "2026-01-01T12:00:00.123456+00:00");
        assert_eq!(seen.recv().unwrap().url, "/api/v1/tip/history/+254759325915");
    }

    #[tokio::test]
    async fn test_tip_status_rejects_path_injection() {
        let service = service_for("http://127.0.0.1:9/api/v1");
        let err = service.tip_status("../admin").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }
}
