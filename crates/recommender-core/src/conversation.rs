//! ============================================================================
//! Conversation State Machine
//! ============================================================================
//! Idle -> AwaitingResponse -> Idle. The turn log is append-only; the user
//! turn is written before the request goes out, and each request cycle adds
//! at most one AI turn.
//!
//! Every accepted query gets a sequence number. A response is applied only
//! while its number is still the outstanding one, so a late reply to an
//! abandoned request can never overwrite newer state.
//! ============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ApiError, ErrorDisposition};
use crate::service::RecommendationApi;
use crate::types::{ConversationTurn, Notice, Product, RecommendationRequest, RecommendationResponse};

/// AI turn appended when a request fails
pub const APOLOGY: &str = "I'm having trouble processing that request. Could you try again?";

const SUCCESS_NOTICE: &str = "Recommendations loaded successfully";
const FAILURE_NOTICE: &str = "Failed to get recommendations. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse { seq: u64 },
}

/// Why a submission was refused. Neither case touches the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("Query is empty")]
    Empty,
    #[error("Still waiting for the previous answer")]
    Busy,
}

/// An accepted query that still has to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub seq: u64,
    pub request: RecommendationRequest,
    /// Set when the query answers a clarification; routes to `/clarify`
    pub session_id: Option<String>,
}

impl PendingQuery {
    pub async fn send(&self, api: &dyn RecommendationApi) -> Result<RecommendationResponse, ApiError> {
        match &self.session_id {
            Some(session_id) => api.clarify_recommendation(&self.request, session_id).await,
            None => api.get_recommendations(&self.request).await,
        }
    }
}

/// Result of applying a response
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Products replaced, summary turn appended
    Answered(Notice),
    /// The service asked a follow-up question
    Clarifying(Notice),
    /// Apology turn appended, products untouched
    Failed(Notice),
    /// The response belonged to a request that is no longer outstanding
    Discarded,
}

impl Outcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Answered(n) | Outcome::Clarifying(n) | Outcome::Failed(n) => Some(n),
            Outcome::Discarded => None,
        }
    }
}

/// What the product area shows. Exactly one of these at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProductView<'a> {
    /// Nothing asked yet
    Nothing,
    Clarification(&'a str),
    /// A completed answer with no products
    Empty,
    Products(&'a [Product]),
}

/// Text of the AI turn that introduces a product list
pub fn summary_for(query: &str, variant: u64) -> String {
    match variant % 3 {
        0 => format!(
            "Based on your search for \"{}\", I've found some great options that might interest you. Here are my top recommendations:",
            query
        ),
        1 => format!(
            "I analyzed your request for \"{}\" and found several products that match your criteria. Take a look at these options:",
            query
        ),
        _ => format!(
            "Looking for \"{}\"? I've curated some excellent choices based on quality, price, and user reviews:",
            query
        ),
    }
}

fn failure_notice(error: &ApiError) -> Notice {
    match error.disposition() {
        ErrorDisposition::RetryLater(Some(wait)) => Notice::error(format!(
            "Too many requests. Please try again in {}s.",
            wait.as_secs()
        )),
        ErrorDisposition::RetryLater(None) => Notice::error("Too many requests. Please try again later."),
        ErrorDisposition::Reauthenticate => Notice::error("Not authorised to use the recommendation service."),
        ErrorDisposition::Fail => Notice::error(FAILURE_NOTICE),
    }
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
    phase: Phase,
    products: Vec<Product>,
    clarification: Option<String>,
    session_id: Option<String>,
    /// Query that triggered the open clarification
    clarified_query: Option<String>,
    answered: bool,
    last_seq: u64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            phase: Phase::Idle,
            products: Vec::new(),
            clarification: None,
            session_id: None,
            clarified_query: None,
            answered: false,
            last_seq: 0,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::AwaitingResponse { .. })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn clarification(&self) -> Option<&str> {
        self.clarification.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Accept a query: append the user turn and hand back what to send
    pub fn begin(&mut self, input: &str) -> Result<PendingQuery, SubmitRejected> {
        let query = input.trim();
        if query.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        if self.is_loading() {
            return Err(SubmitRejected::Busy);
        }

        self.last_seq += 1;
        let seq = self.last_seq;
        self.turns.push(ConversationTurn::user(query));
        self.phase = Phase::AwaitingResponse { seq };

        let (request, session_id) = match (&self.clarification, &self.session_id) {
            (Some(_), Some(session_id)) => {
                let mut request = RecommendationRequest::new(query);
                if let Some(previous) = &self.clarified_query {
                    request = request.with_context("previous_query", serde_json::Value::String(previous.clone()));
                }
                (request, Some(session_id.clone()))
            }
            _ => (RecommendationRequest::new(query), None),
        };

        debug!("Query #{} accepted (clarify: {})", seq, session_id.is_some());
        Ok(PendingQuery {
            seq,
            request,
            session_id,
        })
    }

    /// Apply the result of request `seq`
    pub fn complete(&mut self, seq: u64, result: Result<RecommendationResponse, ApiError>) -> Outcome {
        if self.phase != (Phase::AwaitingResponse { seq }) {
            debug!("Discarding stale response #{}", seq);
            return Outcome::Discarded;
        }
        self.phase = Phase::Idle;

        let response = result.and_then(|r| {
            r.validate().map_err(ApiError::InvalidResponse)?;
            Ok(r)
        });

        match response {
            Ok(response) => self.apply(seq, response),
            Err(error) => {
                warn!("Query #{} failed: {}", seq, error);
                self.turns.push(ConversationTurn::ai(APOLOGY));
                Outcome::Failed(failure_notice(&error))
            }
        }
    }

    fn apply(&mut self, seq: u64, response: RecommendationResponse) -> Outcome {
        let query = self.current_query();
        self.session_id = Some(response.session_id.clone());
        self.answered = true;

        if let Some(question) = response.clarification_text() {
            let question = question.to_string();
            info!("Query #{} needs clarification", seq);
            if self.clarification.is_none() {
                self.clarified_query = Some(query);
            }
            self.turns.push(ConversationTurn::ai(question.clone()));
            self.clarification = Some(question);
            self.products = response.products;
            return Outcome::Clarifying(Notice::info("A little more detail will sharpen the results"));
        }

        info!("Query #{} answered with {} products", seq, response.products.len());
        self.turns.push(ConversationTurn::ai(summary_for(&query, seq - 1)));
        self.products = response.products;
        self.clarification = None;
        self.clarified_query = None;
        Outcome::Answered(Notice::success(SUCCESS_NOTICE))
    }

    /// Latest user message, i.e. the query the outstanding response answers
    fn current_query(&self) -> String {
        self.turns
            .iter()
            .rev()
            .find(|t| t.speaker == crate::types::Speaker::User)
            .map(|t| t.message.clone())
            .unwrap_or_default()
    }

    /// Stop waiting. The outstanding request, if any, becomes stale.
    pub fn abandon(&mut self) -> bool {
        match self.phase {
            Phase::AwaitingResponse { seq } => {
                info!("Abandoned query #{}", seq);
                self.phase = Phase::Idle;
                true
            }
            Phase::Idle => false,
        }
    }

    pub fn product_view(&self) -> ProductView<'_> {
        if !self.products.is_empty() {
            ProductView::Products(&self.products)
        } else if let Some(question) = &self.clarification {
            ProductView::Clarification(question)
        } else if self.answered {
            ProductView::Empty
        } else {
            ProductView::Nothing
        }
    }
}

/// Conversation bound to a backend: begin, call, complete
pub struct RecommendationSession {
    api: Arc<dyn RecommendationApi>,
    state: ConversationState,
}

impl RecommendationSession {
    pub fn new(api: Arc<dyn RecommendationApi>) -> Self {
        Self {
            api,
            state: ConversationState::new(),
        }
    }

    pub fn api(&self) -> Arc<dyn RecommendationApi> {
        Arc::clone(&self.api)
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    pub async fn submit(&mut self, input: &str) -> Result<Outcome, SubmitRejected> {
        let pending = self.state.begin(input)?;
        let result = pending.send(self.api.as_ref()).await;
        Ok(self.state.complete(pending.seq, result))
    }
}
