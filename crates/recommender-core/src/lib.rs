//! ============================================================================
//! RECOMMENDER-CORE: Recommendation Chat Engine
//! ============================================================================
//! Everything behind the terminal front-end:
//! - HTTP client wrapper and typed REST service for the recommendation API
//! - Mock backend exposing the same traits as the real service
//! - Conversation state machine, tip flow and transaction list
//! - Theme settings persisted in an embedded redb store
//! ============================================================================

pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod http_client;
pub mod mock;
pub mod service;
pub mod theme;
pub mod tip;
pub mod transactions;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::{Backend, ClientConfig, Environment};
pub use conversation::{ConversationState, Outcome, ProductView, RecommendationSession, SubmitRejected};
pub use db::PreferenceDb;
pub use error::{ApiError, ConfigError, ErrorDisposition};
pub use http_client::ApiClient;
pub use mock::MockRecommendationService;
pub use service::{HttpRecommendationService, RecommendationApi, TransactionSource};
pub use theme::{Theme, ThemeSettings};
pub use tip::{TipForm, TipOutcome};
pub use transactions::{TransactionList, TransactionView};
pub use types::*;
