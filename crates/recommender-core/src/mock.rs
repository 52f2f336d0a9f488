//! ============================================================================
//! Mock Backend
//! ============================================================================
//! Stand-in for the recommendation and payment services. Implements the same
//! traits as `HttpRecommendationService` with artificial latency and
//! randomised data. Pass a seed to get reproducible output.
//! ============================================================================

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::ApiError;
use crate::service::{RecommendationApi, TransactionSource};
use crate::types::{
    rank_products, Price, Product, ProductSpec, QueryType, RecommendationRequest,
    RecommendationResponse, TipRequest, TipResponse, TipStatusReport, Transaction,
    TransactionStatus,
};

/// Rows produced by `generate_mock_transactions`
pub const MOCK_TRANSACTION_COUNT: usize = 10;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Artificial latency of each mocked call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDelays {
    pub recommend: Duration,
    pub tip: Duration,
    pub transactions: Duration,
}

impl Default for MockDelays {
    fn default() -> Self {
        Self {
            recommend: Duration::from_millis(1500),
            tip: Duration::from_millis(2000),
            transactions: Duration::from_millis(1500),
        }
    }
}

impl MockDelays {
    pub fn none() -> Self {
        Self {
            recommend: Duration::ZERO,
            tip: Duration::ZERO,
            transactions: Duration::ZERO,
        }
    }
}

pub struct MockRecommendationService {
    delays: MockDelays,
    rng: Mutex<StdRng>,
}

impl Default for MockRecommendationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRecommendationService {
    pub fn new() -> Self {
        Self {
            delays: MockDelays::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            delays: MockDelays::default(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with_delays(mut self, delays: MockDelays) -> Self {
        self.delays = delays;
        self
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned lock only means another caller panicked mid-draw
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn answer(&self, query: &str, session_id: String, allow_clarify: bool) -> RecommendationResponse {
        let query_type = QueryType::classify(query);
        if allow_clarify && query.split_whitespace().count() <= 1 {
            return RecommendationResponse {
                clarification: Some(format!(
                    "Could you tell me more about what you need from a {}? A budget or must-have feature helps.",
                    query.trim()
                )),
                products: Vec::new(),
                session_id,
                query_type,
            };
        }

        RecommendationResponse {
            clarification: None,
            products: rank_products(mock_catalogue()),
            session_id,
            query_type,
        }
    }
}

/// Fixed four-product catalogue returned for every query
pub fn mock_catalogue() -> Vec<Product> {
    let product = |n: u8, name: &str, description: &str, specs: Vec<ProductSpec>, price: f64, score: f64| Product {
        name: name.to_string(),
        description: description.to_string(),
        specs,
        image_url: "https://placehold.co/300x200".to_string(),
        price: Price::kes(price),
        vendor_url: format!("https://example.com/product-{}", n),
        confidence_score: score,
    };

    vec![
        product(
            1,
            "Premium Laptop Pro",
            "High-performance laptop with 16GB RAM, 512GB SSD, and dedicated graphics",
            vec![
                ProductSpec::new("RAM", "16GB"),
                ProductSpec::new("Storage", "512GB SSD"),
                ProductSpec::new("Vendor", "TechStore"),
            ],
            129_999.0,
            0.94,
        ),
        product(
            2,
            "Wireless Noise-Cancelling Headphones",
            "Studio-quality sound with 30-hour battery life and premium comfort",
            vec![
                ProductSpec::new("Battery", "30 hours"),
                ProductSpec::new("Vendor", "AudioWorld"),
            ],
            24_999.0,
            0.98,
        ),
        product(
            3,
            "Smart Home Hub",
            "Control all your smart devices from one central interface with voice commands",
            vec![ProductSpec::new("Vendor", "SmartLife")],
            15_999.0,
            0.90,
        ),
        product(
            4,
            "4K Ultra HD Smart TV",
            "55-inch display with vibrant colors and smart streaming capabilities",
            vec![
                ProductSpec::new("Screen", "55 inch"),
                ProductSpec::new("Vendor", "ViewMax"),
            ],
            59_999.0,
            0.92,
        ),
    ]
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..8)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("TX{}", suffix)
}

/// Ten synthetic history rows from the last 30 days
pub fn generate_mock_transactions<R: Rng + ?Sized>(rng: &mut R) -> Vec<Transaction> {
    let now = Utc::now();
    (0..MOCK_TRANSACTION_COUNT)
        .map(|_| {
            let status = TransactionStatus::ALL[rng.gen_range(0..TransactionStatus::ALL.len())];
            Transaction {
                id: random_id(rng),
                phone_number: format!("254{}", rng.gen_range(100_000_000u32..=999_999_999)),
                amount: rng.gen_range(50..1050) as f64,
                status,
                created_at: now - chrono::Duration::days(rng.gen_range(0..30)),
            }
        })
        .collect()
}

#[async_trait]
impl RecommendationApi for MockRecommendationService {
    async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApiError> {
        Self::pause(self.delays.recommend).await;
        let session_id = uuid::Uuid::new_v4().to_string();
        debug!("Mock recommend '{}' (session {})", request.query, session_id);
        Ok(self.answer(&request.query, session_id, true))
    }

    async fn clarify_recommendation(
        &self,
        request: &RecommendationRequest,
        session_id: &str,
    ) -> Result<RecommendationResponse, ApiError> {
        Self::pause(self.delays.recommend).await;
        debug!("Mock clarify '{}' (session {})", request.query, session_id);
        Ok(self.answer(&request.query, session_id.to_string(), false))
    }

    async fn initiate_tip(&self, request: &TipRequest) -> Result<TipResponse, ApiError> {
        Self::pause(self.delays.tip).await;
        let transaction_id = self.with_rng(|rng| random_id(rng));
        debug!("Mock tip {} from {}", transaction_id, request.phone_number);
        Ok(TipResponse {
            transaction_id,
            status: TransactionStatus::Pending.to_string(),
            message: "Please check your phone to complete the payment".to_string(),
        })
    }

    async fn tip_status(&self, transaction_id: &str) -> Result<TipStatusReport, ApiError> {
        let status = self.with_rng(|rng| TransactionStatus::ALL[rng.gen_range(0..3)]);
        let now = Utc::now().to_rfc3339();
        Ok(TipStatusReport {
            transaction_id: transaction_id.to_string(),
            status: status.to_string(),
            amount: 100.0,
            phone_number: "254700000000".to_string(),
            created_at: now.clone(),
            updated_at: now,
            error: None,
        })
    }
}

#[async_trait]
impl TransactionSource for MockRecommendationService {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        Self::pause(self.delays.transactions).await;
        Ok(self.with_rng(|rng| generate_mock_transactions(rng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn quick(seed: u64) -> MockRecommendationService {
        MockRecommendationService::seeded(seed).with_delays(MockDelays::none())
    }

    #[test]
    fn test_mock_transactions_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let rows = generate_mock_transactions(&mut rng);
        assert_eq!(rows.len(), MOCK_TRANSACTION_COUNT);

        let now = Utc::now();
        for row in &rows {
            assert_eq!(row.phone_number.len(), 12, "phone: {}", row.phone_number);
            assert!(row.phone_number.starts_with("254"));
            assert!(row.phone_number.chars().all(|c| c.is_ascii_digit()));

            assert_eq!(row.id.len(), 10);
            assert!(row.id.starts_with("TX"));
            assert!(row.id[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

            assert!((50.0..=1049.0).contains(&row.amount));
            assert!(TransactionStatus::ALL.contains(&row.status));
            assert!(row.created_at <= now);
            assert!(now - row.created_at <= chrono::Duration::days(30));
        }
    }

    #[test]
    fn test_mock_transactions_reproducible_with_seed() {
        let a = generate_mock_transactions(&mut StdRng::seed_from_u64(7));
        let b = generate_mock_transactions(&mut StdRng::seed_from_u64(7));
        let ids_a: Vec<_> = a.iter().map(|t| t.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[tokio::test]
    async fn test_recommendations_are_ranked_and_unique() {
        let response = quick(1)
            .get_recommendations(&RecommendationRequest::new("Need a good laptop for coding"))
            .await
            .unwrap();

        assert!(response.clarification.is_none());
        assert_eq!(response.products.len(), 4);
        assert_eq!(response.query_type, QueryType::FeatureBased);
        assert!(response.validate().is_ok());

        let urls: HashSet<_> = response.products.iter().map(|p| &p.vendor_url).collect();
        assert_eq!(urls.len(), 4);
        assert_eq!(response.products[0].name, "Wireless Noise-Cancelling Headphones");
    }

    #[tokio::test]
    async fn test_single_word_query_asks_for_clarification() {
        let service = quick(1);
        let response = service
            .get_recommendations(&RecommendationRequest::new("phone"))
            .await
            .unwrap();
        assert!(response.clarification_text().is_some());
        assert!(response.products.is_empty());

        let followup = service
            .clarify_recommendation(&RecommendationRequest::new("under"), &response.session_id)
            .await
            .unwrap();
        assert_eq!(followup.session_id, response.session_id);
        assert!(!followup.products.is_empty());
    }

    #[tokio::test]
    async fn test_mock_tip_is_pending() {
        let response = quick(3)
            .initiate_tip(&TipRequest {
                phone_number: "+254759325915".into(),
                amount: 100.0,
            })
            .await
            .unwrap();
        assert_eq!(response.status, "pending");
        assert!(response.transaction_id.starts_with("TX"));
    }

    #[tokio::test]
    async fn test_configured_delay_applies() {
        let service = MockRecommendationService::seeded(9).with_delays(MockDelays {
            transactions: Duration::from_millis(30),
            ..MockDelays::none()
        });
        let started = std::time::Instant::now();
        let rows = service.fetch_transactions().await.unwrap();
        assert_eq!(rows.len(), MOCK_TRANSACTION_COUNT);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
