// self
use crate::{_prelude::*, obs::FlowKind, redact::ActSummary};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapper used by every identity flow.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"agbac_broker.flow",
				flow = kind.as_str(),
				stage,
				subject = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the sanitized principal once it is known.
	///
	/// Callers pass the output of [`crate::redact::sanitize_identifier`], never a raw value.
	pub fn record_subject(&self, sanitized: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("subject", sanitized);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = sanitized;
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Logs a configuration value that is accepted but likely wrong.
pub fn emit_config_warning(field: &'static str, message: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(field, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (field, message);
	}
}

/// Logs the class of a failed flow. Error messages never embed secrets.
pub fn emit_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			flow = kind.as_str(),
			retryable = error.is_retryable(),
			caller_error = error.is_caller_error(),
			"{error}"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Logs the log-safe shape of an accepted act claim.
pub fn emit_act_accepted(kind: FlowKind, summary: &ActSummary) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), act = %summary, "act claim accepted");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, summary);
	}
}

/// Logs a retry decision.
pub fn emit_retry(kind: FlowKind, attempt: u32, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			flow = kind.as_str(),
			attempt,
			delay_ms = delay.whole_milliseconds() as u64,
			"retrying after transient failure"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempt, delay);
	}
}
