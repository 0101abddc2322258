//! Observability helpers shared by the session negotiator and the content lister.
//!
//! - Every flow stage runs inside a span named `markbox.flow` with `flow` and `stage` fields.
//! - Enable the `metrics` feature to increment the `markbox_flow_total` counter for every
//!   attempt/success/redirect/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Session negotiation (resume, callback exchange, or handshake start).
	Connect,
	/// Remote content listing and single-post reads.
	Content,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Connect => "connect",
			FlowKind::Content => "content",
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
	/// The flow ended by asking the caller to redirect the user.
	Redirect,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Redirect => "redirect",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Classifies a finished flow result.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(e) if e.is_redirect() => FlowOutcome::Redirect,
			Err(_) => FlowOutcome::Failure,
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_classifies_redirects_separately() {
		let ok: Result<()> = Ok(());
		let redirect: Result<()> = Err(Error::AuthorizationRequired {
			authorize_url: Url::parse("https://example.com/auth")
				.expect("Authorize URL fixture should parse."),
		});
		let failure: Result<()> = Err(Error::NotFound { path: "/a.md".into() });

		assert_eq!(FlowOutcome::of(&ok), FlowOutcome::Success);
		assert_eq!(FlowOutcome::of(&redirect), FlowOutcome::Redirect);
		assert_eq!(FlowOutcome::of(&failure), FlowOutcome::Failure);
	}
}
