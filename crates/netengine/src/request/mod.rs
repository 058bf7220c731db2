//! URL request state machine, spec §4.G.

mod fingerprint;

pub use fingerprint::Fingerprint;

use net_core::error::{EngineError, ErrorCategory};

/// A request's lifecycle state. NEW and the five working states precede
/// exactly one of the three terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
	New,
	Resolving,
	Connecting,
	WaitingForHeaders,
	Reading,
	RedirectPending,
	Succeeded,
	Failed,
	Canceled,
}

impl RequestState {
	pub fn is_terminal(self) -> bool {
		matches!(self, RequestState::Succeeded | RequestState::Failed | RequestState::Canceled)
	}
}

/// Events driving the state machine. Each corresponds to a suspension point
/// resuming on the network task (spec §4.A/§5).
#[derive(Clone, Debug)]
pub enum Event {
	Start { address_already_known: bool },
	ResolutionComplete,
	ConnectionEstablished,
	HeadersReceived { status: u16 },
	RedirectFollowed,
	RedirectDeclined,
	BodyComplete,
	Error(EngineError),
	Cancel,
}

/// One emitted callback, in the order the user's executor observes them.
/// Spec property P1: the emitted sequence is a prefix of
/// (`RedirectReceived*`, `ResponseStarted`, `ReadCompleted*`, terminal)
/// ending with exactly one terminal callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
	RedirectReceived,
	ResponseStarted,
	ReadCompleted,
	Succeeded,
	Failed,
	Canceled,
}

#[derive(Debug)]
pub struct Request {
	pub state: RequestState,
	pub redirect_count: u32,
	pub max_redirects: u32,
	terminal_delivered: bool,
}

impl Request {
	pub fn new(max_redirects: u32) -> Self {
		Self {
			state: RequestState::New,
			redirect_count: 0,
			max_redirects,
			terminal_delivered: false,
		}
	}

	/// Applies one event, returning the callbacks it produces. Cancellation
	/// is legal in every non-terminal state; once a terminal callback has
	/// been delivered, further events are ignored (invariant I2 / P1).
	pub fn apply(&mut self, event: Event) -> Vec<Callback> {
		if self.terminal_delivered {
			return Vec::new();
		}

		if matches!(event, Event::Cancel) {
			return self.cancel();
		}

		match (self.state, event) {
			(RequestState::New, Event::Start { address_already_known: true }) => {
				self.state = RequestState::Connecting;
				Vec::new()
			},
			(RequestState::New, Event::Start { address_already_known: false }) => {
				self.state = RequestState::Resolving;
				Vec::new()
			},

			(RequestState::Resolving, Event::ResolutionComplete) => {
				self.state = RequestState::Connecting;
				Vec::new()
			},
			(RequestState::Resolving, Event::Error(err)) => self.fail_with(err),

			(RequestState::Connecting, Event::ConnectionEstablished) => {
				self.state = RequestState::WaitingForHeaders;
				Vec::new()
			},
			(RequestState::Connecting, Event::Error(err)) => self.fail_with(err),

			(RequestState::WaitingForHeaders, Event::HeadersReceived { status }) if (300..400).contains(&status) => {
				self.state = RequestState::RedirectPending;
				vec![Callback::RedirectReceived]
			},
			(RequestState::WaitingForHeaders, Event::HeadersReceived { .. }) => {
				self.state = RequestState::Reading;
				vec![Callback::ResponseStarted]
			},
			(RequestState::WaitingForHeaders, Event::Error(err)) => self.fail_with(err),

			(RequestState::RedirectPending, Event::RedirectDeclined) => self.succeed(),
			(RequestState::RedirectPending, Event::RedirectFollowed) => {
				self.redirect_count += 1;
				if self.redirect_count > self.max_redirects {
					return self.fail_with(EngineError::new(ErrorCategory::Internal, 1, "redirect limit exceeded"));
				}
				self.state = RequestState::Resolving;
				Vec::new()
			},

			(RequestState::Reading, Event::BodyComplete) => self.succeed(),
			(RequestState::Reading, Event::Error(err)) => self.fail_with(err),

			(_, Event::Error(err)) => self.fail_with(err),
			_ => Vec::new(),
		}
	}

	fn succeed(&mut self) -> Vec<Callback> {
		self.state = RequestState::Succeeded;
		self.terminal_delivered = true;
		vec![Callback::Succeeded]
	}

	fn fail_with(&mut self, _err: EngineError) -> Vec<Callback> {
		self.state = RequestState::Failed;
		self.terminal_delivered = true;
		vec![Callback::Failed]
	}

	fn cancel(&mut self) -> Vec<Callback> {
		self.state = RequestState::Canceled;
		self.terminal_delivered = true;
		vec![Callback::Canceled]
	}
}
