//! Routing decision engine: maps a request to a service plus any URL/query/
//! header edits, based on a priority-ordered, predicated rule set.
//!
//! - [`predicate`] — compiled predicate evaluation
//! - [`engine`] — [`RoutingEngine`] and [`engine::RoutingDecision`]

pub mod engine;
pub mod predicate;

pub use engine::{RoutingDecision, RoutingEngine};

/// Routing-engine-local failure. Converts to [`crate::models::error::GatewayError`]
/// at the dispatcher boundary, per the teacher's pattern of keeping narrow
/// errors local to their subsystem.
#[derive(Debug, thiserror::Error)]
pub enum RuleEvalError {
    #[error("malformed routing predicate or rule: {0}")]
    BadPattern(String),
    #[error("no routing rule matched path {path}")]
    NoRuleMatched { path: String },
}

impl From<RuleEvalError> for crate::models::error::GatewayError {
    fn from(err: RuleEvalError) -> Self {
        match err {
            RuleEvalError::BadPattern(message) => crate::models::error::GatewayError::Config {
                message,
                route: String::new(),
            },
            RuleEvalError::NoRuleMatched { path } => {
                crate::models::error::GatewayError::NoRuleMatched { path }
            }
        }
    }
}
