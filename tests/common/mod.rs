//! Shared fixtures for the integration suites: a scripted transport and a counting session
//! provider, both driven by a [`ManualClock`].

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
// self
use portal_request::{
	ApiClient,
	clock::{Clock, ManualClock},
	error::{SessionError, TransportError},
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	serde_json::Value,
	session::{Session, SessionFuture, SessionProvider},
	url::Url,
};

pub const BASE_URL: &str = "https://portal.example.org/rest/v1";

pub fn start() -> OffsetDateTime {
	macros::datetime!(2025-05-12 08:30 UTC)
}

/// Scripted reply: a response or a network failure.
#[derive(Clone, Debug)]
pub enum Reply {
	Respond(TransportResponse),
	NetworkDown,
}
impl Reply {
	pub fn json(status: u16, body: Value) -> Self {
		Self::Respond(TransportResponse::json(status, &body))
	}

	pub fn status(status: u16, reason: &str) -> Self {
		Self::Respond(TransportResponse {
			status,
			reason: Some(reason.to_owned()),
			body: Vec::new(),
		})
	}
}

/// Transport that replays queued replies (falling back to a default) and records every send.
pub struct Recording {
	queue: Mutex<VecDeque<Reply>>,
	fallback: Reply,
	delay: std::time::Duration,
	seen: Mutex<Vec<TransportRequest>>,
}
impl Recording {
	pub fn new(fallback: Reply) -> Arc<Self> {
		Self::with_delay(fallback, std::time::Duration::ZERO)
	}

	pub fn with_delay(fallback: Reply, delay: std::time::Duration) -> Arc<Self> {
		Arc::new(Self {
			queue: Mutex::new(VecDeque::new()),
			fallback,
			delay,
			seen: Mutex::new(Vec::new()),
		})
	}

	pub fn enqueue(&self, reply: Reply) {
		self.queue.lock().push_back(reply);
	}

	pub fn dispatches(&self) -> usize {
		self.seen.lock().len()
	}

	pub fn requests(&self) -> Vec<TransportRequest> {
		self.seen.lock().clone()
	}
}
impl HttpTransport for Recording {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		self.seen.lock().push(request);

		let reply = self.queue.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
		let delay = self.delay;

		Box::pin(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}

			match reply {
				Reply::Respond(response) => Ok(response),
				Reply::NetworkDown => Err(TransportError::network(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"connection refused",
				))),
			}
		})
	}
}

/// Session provider that mints `access-{n}` on the n-th refresh and counts refreshes.
pub struct Sessions {
	clock: Arc<ManualClock>,
	current: Mutex<Option<Session>>,
	refreshes: AtomicUsize,
	fail_refresh: bool,
}
impl Sessions {
	pub fn signed_in(clock: Arc<ManualClock>, expires_in: Duration) -> Arc<Self> {
		let session = Session::new("access-0", clock.now() + expires_in);

		Arc::new(Self {
			clock,
			current: Mutex::new(Some(session)),
			refreshes: AtomicUsize::new(0),
			fail_refresh: false,
		})
	}

	pub fn broken(clock: Arc<ManualClock>, current: Option<Session>) -> Arc<Self> {
		Arc::new(Self {
			clock,
			current: Mutex::new(current),
			refreshes: AtomicUsize::new(0),
			fail_refresh: true,
		})
	}

	pub fn refreshes(&self) -> usize {
		self.refreshes.load(Ordering::SeqCst)
	}
}
impl SessionProvider for Sessions {
	fn current_session(&self) -> SessionFuture<'_, Option<Session>> {
		let current = self.current.lock().clone();

		Box::pin(async move { Ok(current) })
	}

	fn refresh_session(&self) -> SessionFuture<'_, Session> {
		Box::pin(async move {
			let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;

			if self.fail_refresh {
				return Err(SessionError::Rejected {
					status: 400,
					message: "Refresh Token Not Found".into(),
				});
			}

			let session = Session::new(format!("access-{n}"), self.clock.now() + Duration::hours(1));

			*self.current.lock() = Some(session.clone());

			Ok(session)
		})
	}
}

/// Client wired to `transport` and `sessions` with the sweeper disabled.
pub fn client(
	transport: Arc<Recording>,
	sessions: Arc<Sessions>,
	clock: Arc<ManualClock>,
) -> ApiClient {
	ApiClient::builder(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
		.session_provider(sessions)
		.clock(clock)
		.sweep_interval(None)
		.build_with_transport(transport)
		.expect("Client fixture should build.")
}

/// Clock, signed-in provider (session valid for an hour), and client over `transport`.
pub fn signed_in_client(transport: Arc<Recording>) -> (ApiClient, Arc<Sessions>, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::new(start()));
	let sessions = Sessions::signed_in(clock.clone(), Duration::hours(1));
	let client = client(transport, sessions.clone(), clock.clone());

	(client, sessions, clock)
}
