//! ============================================================================
//! Core Types for the Recommender
//! ============================================================================
//! Wire types for the recommendation and tip endpoints, plus the client-side
//! conversation and transaction records. JSON field names match the REST API.
//! ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Currency assumed when the service omits one
pub const DEFAULT_CURRENCY: &str = "KES";

/// Maximum number of products shown for one query
pub const MAX_PRODUCTS: usize = 5;

// ============================================================================
// Products
// ============================================================================

/// A single key/value specification line on a product card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub key: String,
    pub value: String,
}

impl ProductSpec {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Price {
    pub fn kes(value: f64) -> Self {
        Self {
            value,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// "KSh 1299.99" style label; whole amounts drop the ".00"
    pub fn display(&self) -> String {
        let amount = format!("{:.2}", self.value);
        let amount = amount.strip_suffix(".00").unwrap_or(&amount).to_string();
        if self.currency.eq_ignore_ascii_case(DEFAULT_CURRENCY) {
            format!("KSh {}", amount)
        } else {
            format!("{} {}", self.currency, amount)
        }
    }
}

/// A recommended product. Immutable once received; keyed by `vendor_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub specs: Vec<ProductSpec>,
    pub image_url: String,
    pub price: Price,
    pub vendor_url: String,
    /// Engine certainty in [0, 1]
    pub confidence_score: f64,
}

/// Drop duplicate vendor URLs (first wins), order by confidence, keep the top results.
pub fn rank_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Product> = products
        .into_iter()
        .filter(|p| seen.insert(p.vendor_url.clone()))
        .collect();

    unique.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique.truncate(MAX_PRODUCTS);
    unique
}

// ============================================================================
// Recommendation Exchange
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Comparative,
    FeatureBased,
    Subjective,
}

impl QueryType {
    const COMPARATIVE_WORDS: &'static [&'static str] = &["best", "better", "vs", "compared"];
    const FEATURE_WORDS: &'static [&'static str] = &["with", "has", "need", "want"];

    /// Keyword classification of a free-text query
    pub fn classify(query: &str) -> Self {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        if words.iter().any(|w| Self::COMPARATIVE_WORDS.contains(w)) {
            QueryType::Comparative
        } else if words.iter().any(|w| Self::FEATURE_WORDS.contains(w)) {
            QueryType::FeatureBased
        } else {
            QueryType::Subjective
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            QueryType::Comparative => "comparative",
            QueryType::FeatureBased => "feature_based",
            QueryType::Subjective => "subjective",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RecommendationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
            language: None,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Service reply. A present `clarification` may come with no products,
/// which means the caller should re-prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
    #[serde(default)]
    pub products: Vec<Product>,
    pub session_id: String,
    pub query_type: QueryType,
}

impl RecommendationResponse {
    /// Clarification text, ignoring blank strings
    pub fn clarification_text(&self) -> Option<&str> {
        self.clarification
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Check the per-response invariants: unique vendor URLs, scores in [0, 1]
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for product in &self.products {
            if !seen.insert(product.vendor_url.as_str()) {
                return Err(format!("duplicate vendor_url {}", product.vendor_url));
            }
            if !(0.0..=1.0).contains(&product.confidence_score) {
                return Err(format!(
                    "confidence_score {} out of range for {}",
                    product.confidence_score, product.name
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tips & Transactions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipRequest {
    pub phone_number: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipResponse {
    pub transaction_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Completed,
        TransactionStatus::Pending,
        TransactionStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(TransactionStatus::Completed),
            "pending" => Ok(TransactionStatus::Pending),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

/// One row of the transaction history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub phone_number: String,
    pub amount: f64,
    pub status: TransactionStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn amount_display(&self) -> String {
        format!("KSh {:.2}", self.amount)
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamp taken as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Reply of the tip status lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipStatusReport {
    pub transaction_id: String,
    pub status: String,
    pub amount: f64,
    pub phone_number: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Envelope of the per-phone history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionHistory {
    pub phone_number: String,
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// Conversation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Ai,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub message: String,
}

impl ConversationTurn {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            message: message.into(),
        }
    }

    pub fn ai(message: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            message: message.into(),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient, non-blocking notification (a "toast")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
