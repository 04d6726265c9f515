//! Optional observability helpers for identity flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `agbac_broker.flow` with the `flow`,
//!   `stage` (vendor or call site), and `subject` (sanitized principal) fields, plus warning
//!   events for suspicious configuration and failed flows.
//! - Enable `metrics` to increment the `agbac_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.
//!
//! Nothing emitted here carries tokens, assertions, secrets, or raw act claims.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Identity flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Mapping a session record onto an act claim.
	ActExtraction,
	/// Signing an out-of-session act assertion.
	AssertionSigning,
	/// Verifying a received act assertion.
	AssertionVerification,
	/// Requesting a dual-subject token from a provider.
	TokenRequest,
	/// Calling a protected resource with a dual-subject token.
	ResourceCall,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ActExtraction => "act_extraction",
			FlowKind::AssertionSigning => "assertion_signing",
			FlowKind::AssertionVerification => "assertion_verification",
			FlowKind::TokenRequest => "token_request",
			FlowKind::ResourceCall => "resource_call",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the terminal outcome of `result` and logs failures.
pub fn record_flow_result<T>(kind: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			emit_failure(kind, e);
			record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}
}
