//! ============================================================================
//! Tip Flow - M-Pesa tip dialog state and submission
//! ============================================================================
//! Input is checked before any request: phone and amount must be non-empty
//! and the amount must parse as a number. Format and range rules belong to
//! the payment gateway, whose rejection text is passed on to the user.
//! On success the dialog closes and both fields clear; on failure they are
//! kept so the user can resubmit.
//! ============================================================================

use tracing::{info, warn};

use crate::error::ApiError;
use crate::service::RecommendationApi;
use crate::types::{Notice, TipRequest, TipResponse};

pub const VALIDATION_MESSAGE: &str = "Please provide a valid phone number and amount";
pub const FAILURE_MESSAGE: &str = "Failed to initiate payment. Please try again.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TipValidationError {
    #[error("phone number is empty")]
    MissingPhone,
    #[error("amount is empty")]
    MissingAmount,
    #[error("amount '{0}' is not a number")]
    InvalidAmount(String),
}

/// Text of a 4xx answer, i.e. the gateway refused the input
fn gateway_rejection(error: &ApiError) -> Option<&str> {
    match error {
        ApiError::Status { status, message } if (400..500).contains(status) => {
            let message = message.trim();
            (!message.is_empty()).then_some(message)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TipOutcome {
    /// Rejected before any request was made
    Invalid {
        reason: TipValidationError,
        notice: Notice,
    },
    /// A submission is already in flight
    Busy,
    Sent {
        response: TipResponse,
        notice: Notice,
    },
    Failed {
        error: String,
        notice: Notice,
    },
}

impl TipOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            TipOutcome::Invalid { notice, .. }
            | TipOutcome::Sent { notice, .. }
            | TipOutcome::Failed { notice, .. } => Some(notice),
            TipOutcome::Busy => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TipForm {
    open: bool,
    phone_number: String,
    amount: String,
    submitting: bool,
}

impl TipForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Dismiss without submitting. Entered values stay.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn set_phone_number(&mut self, value: impl Into<String>) {
        self.phone_number = value.into();
    }

    pub fn set_amount(&mut self, value: impl Into<String>) {
        self.amount = value.into();
    }

    pub fn validate(&self) -> Result<TipRequest, TipValidationError> {
        let phone_number = self.phone_number.trim();
        if phone_number.is_empty() {
            return Err(TipValidationError::MissingPhone);
        }
        let amount = self.amount.trim();
        if amount.is_empty() {
            return Err(TipValidationError::MissingAmount);
        }
        let amount = amount
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| TipValidationError::InvalidAmount(self.amount.clone()))?;

        Ok(TipRequest {
            phone_number: phone_number.to_string(),
            amount,
        })
    }

    /// Validate and mark the form as submitting
    pub fn start(&mut self) -> Result<TipRequest, TipOutcome> {
        if self.submitting {
            return Err(TipOutcome::Busy);
        }
        let request = self.validate().map_err(|reason| TipOutcome::Invalid {
            reason,
            notice: Notice::error(VALIDATION_MESSAGE),
        })?;
        self.submitting = true;
        Ok(request)
    }

    /// Apply the gateway's answer to a started submission
    pub fn finish(&mut self, result: Result<TipResponse, ApiError>) -> TipOutcome {
        self.submitting = false;
        match result {
            Ok(response) => {
                let notice = Notice::success(format!(
                    "M-Pesa STK Push initiated! Check your phone {} to complete the transaction.",
                    self.phone_number.trim()
                ));
                info!("Tip {} initiated ({})", response.transaction_id, response.status);
                self.open = false;
                self.phone_number.clear();
                self.amount.clear();
                TipOutcome::Sent { response, notice }
            }
            Err(error) => {
                warn!("Tip initiation failed: {}", error);
                let notice = match gateway_rejection(&error) {
                    Some(reason) => Notice::error(format!("Failed to initiate payment: {}", reason)),
                    None => Notice::error(FAILURE_MESSAGE),
                };
                TipOutcome::Failed {
                    error: error.to_string(),
                    notice,
                }
            }
        }
    }

    pub async fn submit(&mut self, api: &dyn RecommendationApi) -> TipOutcome {
        let request = match self.start() {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };
        let result = api.initiate_tip(&request).await;
        self.finish(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoticeLevel, RecommendationRequest, RecommendationResponse, TipStatusReport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TipApi {
        fail: bool,
        calls: AtomicUsize,
    }

    impl TipApi {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecommendationApi for TipApi {
        async fn get_recommendations(&self, _: &RecommendationRequest) -> Result<RecommendationResponse, ApiError> {
            unreachable!()
        }

        async fn clarify_recommendation(
            &self,
            _: &RecommendationRequest,
            _: &str,
        ) -> Result<RecommendationResponse, ApiError> {
            unreachable!()
        }

        async fn initiate_tip(&self, request: &TipRequest) -> Result<TipResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Status {
                    status: 500,
                    message: "gateway down".into(),
                });
            }
            Ok(TipResponse {
                transaction_id: format!("TXN_{}", request.phone_number),
                status: "pending".into(),
                message: "Please check your phone to complete the payment".into(),
            })
        }

        async fn tip_status(&self, _: &str) -> Result<TipStatusReport, ApiError> {
            unreachable!()
        }
    }

    fn filled(phone: &str, amount: &str) -> TipForm {
        let mut form = TipForm::new();
        form.open();
        form.set_phone_number(phone);
        form.set_amount(amount);
        form
    }

    #[tokio::test]
    async fn test_non_numeric_amount_makes_no_request() {
        let api = TipApi::new(false);
        let mut form = filled("+254759325915", "abc");

        let outcome = form.submit(&api).await;
        match &outcome {
            TipOutcome::Invalid { reason, notice } => {
                assert_eq!(reason, &TipValidationError::InvalidAmount("abc".into()));
                assert_eq!(notice.message, VALIDATION_MESSAGE);
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert!(form.is_open());
        assert_eq!(form.amount(), "abc");
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(filled("  ", "100").validate(), Err(TipValidationError::MissingPhone));
        assert_eq!(filled("254700000000", "").validate(), Err(TipValidationError::MissingAmount));
        assert!(matches!(
            filled("254700000000", "NaN").validate(),
            Err(TipValidationError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_success_closes_and_clears() {
        let api = TipApi::new(false);
        let mut form = filled("+254759325915", "100");

        let outcome = form.submit(&api).await;
        let notice = outcome.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert!(notice.message.contains("+254759325915"));
        assert!(matches!(outcome, TipOutcome::Sent { .. }));

        assert!(!form.is_open());
        assert_eq!(form.phone_number(), "");
        assert_eq!(form.amount(), "");
        assert!(!form.is_submitting());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_values() {
        let api = TipApi::new(true);
        let mut form = filled("+254759325915", "100");

        let outcome = form.submit(&api).await;
        assert_eq!(outcome.notice().unwrap().message, FAILURE_MESSAGE);
        assert!(form.is_open());
        assert_eq!(form.phone_number(), "+254759325915");
        assert_eq!(form.amount(), "100");
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_gateway_rejection_reason_is_shown() {
        use crate::http_client::ApiClient;
        use crate::service::HttpRecommendationService;
        use crate::test_support::serve_once;
        use crate::ClientConfig;

        let body = serde_json::json!({ "detail": "Tip amount must be between KES 10 and KES 5,000" });
        let (base_url, _seen) = serve_once(400, body.to_string(), None);
        let config = ClientConfig::development().with_base_url(&base_url).unwrap();
        let service = HttpRecommendationService::new(ApiClient::new(&config).unwrap());

        let mut form = filled("+254759325915", "5");
        let outcome = form.submit(&service).await;
        let notice = outcome.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(
            notice.message,
            "Failed to initiate payment: Tip amount must be between KES 10 and KES 5,000"
        );
        assert!(matches!(outcome, TipOutcome::Failed { .. }));
        assert_eq!(form.amount(), "5");
    }

    #[test]
    fn test_start_while_submitting_is_busy() {
        let mut form = filled("254700000000", "50");
        let request = form.start().unwrap();
        assert_eq!(request.amount, 50.0);
        assert_eq!(form.start().unwrap_err(), TipOutcome::Busy);
    }
}
