use std::collections::BTreeSet;

use crate::bounds::BoundViolation;
use crate::tools::{ToolCallRequest, ToolDescriptor, ToolResult};

pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "I apologize for the technical issue. Please try rephrasing your question.";
pub const BOUNDS_EXCEEDED_MESSAGE: &str =
    "I apologize, but I couldn't process your request. Please try again.";

/// Why a run ended without a final answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ModelUnavailable,
    Bound(BoundViolation),
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelUnavailable => "model_unavailable",
            Self::Bound(violation) => violation.as_str(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FallbackReply {
    pub reason_code: &'static str,
    pub user_message: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, observation: ToolResult },
}

/// Checks model output against what the model was actually offered, and picks the fixed
/// reply for runs that end early.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    advertised: BTreeSet<String>,
}

impl GuardrailPolicy {
    pub fn for_catalog(catalog: &[ToolDescriptor]) -> Self {
        Self { advertised: catalog.iter().map(|tool| tool.name.clone()).collect() }
    }

    pub fn screen(&self, call: &ToolCallRequest) -> GuardrailDecision {
        if self.advertised.contains(&call.name) {
            return GuardrailDecision::Allow;
        }
        let available = self.advertised.iter().cloned().collect::<Vec<_>>();
        GuardrailDecision::Deny {
            reason_code: "tool_not_advertised",
            observation: ToolResult::not_found(&call.name, &available),
        }
    }

    /// Operators tell "model unreachable" from "model struggling" by reason code; users get
    /// a fixed apology either way.
    pub fn fallback(&self, reason: StopReason) -> FallbackReply {
        let user_message = match reason {
            StopReason::ModelUnavailable => MODEL_UNAVAILABLE_MESSAGE,
            StopReason::Bound(_) => BOUNDS_EXCEEDED_MESSAGE,
        };
        FallbackReply { reason_code: reason.as_str(), user_message }
    }
}
