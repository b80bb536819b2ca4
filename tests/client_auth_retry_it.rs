mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use serde_json::json;
use time::Duration;
// self
use common::{Recording, Reply, Sessions};
use portal_request::{Error, RequestError, clock::ManualClock, session::Session};

#[tokio::test]
async fn single_401_is_absorbed_by_refresh_and_retry() {
	let transport = Recording::new(Reply::json(200, json!({ "visits": 8 })));
	let (client, sessions, _) = common::signed_in_client(transport.clone());

	transport.enqueue(Reply::status(401, "Unauthorized"));

	let payload = client.get("/api/visits").await.expect("Retry should recover from the 401.");
	let requests = transport.requests();

	assert_eq!(payload, json!({ "visits": 8 }));
	assert_eq!(sessions.refreshes(), 1);
	assert_eq!(requests.len(), 2);
	assert_eq!(requests[0].header("authorization"), Some("Bearer access-0"));
	assert_eq!(requests[1].header("authorization"), Some("Bearer access-1"));
	assert_eq!(client.tokens().metrics().attempts(), 1);
}

#[tokio::test]
async fn persistent_401_stops_after_one_retry() {
	let transport = Recording::new(Reply::json(401, json!({ "error": "JWT expired" })));
	let (client, sessions, _) = common::signed_in_client(transport.clone());
	let err = client.get("/api/medical-records").await.expect_err("Second 401 should surface.");

	assert!(matches!(err, Error::Request(RequestError { status: 401, .. })));
	assert!(err.is_unauthorized());
	assert_eq!(transport.dispatches(), 2);
	assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn failed_reactive_refresh_is_reported_as_unauthorized() {
	let clock = Arc::new(ManualClock::new(common::start()));
	let session = Session::new("access-0", common::start() + Duration::hours(1));
	let sessions = Sessions::broken(clock.clone(), Some(session));
	let transport = Recording::new(Reply::status(401, "Unauthorized"));
	let client = common::client(transport.clone(), sessions.clone(), clock);
	let err = client.get("/api/donors").await.expect_err("Refresh failure should surface.");

	assert!(matches!(err, Error::Request(ref e) if *e == RequestError::unauthorized()));
	assert_eq!(transport.dispatches(), 1);
	assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
	let transport = Recording::new(Reply::status(500, "Internal Server Error"));
	let (client, sessions, _) = common::signed_in_client(transport.clone());
	let err = client.get("/api/orphans").await.expect_err("500 should surface.");

	assert!(matches!(
		err,
		Error::Request(RequestError { status: 500, ref message }) if message == "Internal Server Error"
	));
	assert_eq!(transport.dispatches(), 1);
	assert_eq!(sessions.refreshes(), 0);
}

#[tokio::test]
async fn network_failures_are_not_retried() {
	let transport = Recording::new(Reply::NetworkDown);
	let (client, sessions, _) = common::signed_in_client(transport.clone());
	let err = client.get("/api/clinics").await.expect_err("Network failure should surface.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(transport.dispatches(), 1);
	assert_eq!(sessions.refreshes(), 0);
}

#[tokio::test]
async fn session_near_expiry_is_refreshed_before_dispatch() {
	let clock = Arc::new(ManualClock::new(common::start()));
	let sessions = Sessions::signed_in(clock.clone(), Duration::seconds(30));
	let transport = Recording::new(Reply::json(200, json!([])));
	let client = common::client(transport.clone(), sessions.clone(), clock);

	client.get("/api/tutors").await.expect("Request should succeed after refresh.");

	assert_eq!(sessions.refreshes(), 1);
	assert_eq!(transport.requests()[0].header("authorization"), Some("Bearer access-1"));
}

#[tokio::test]
async fn session_outside_window_is_reused() {
	let (client, sessions, clock) =
		common::signed_in_client(Recording::new(Reply::json(200, json!([]))));

	clock.advance(Duration::minutes(58));
	client.get("/api/tutors").await.expect("Session still has two minutes left.");

	assert_eq!(sessions.refreshes(), 0);

	clock.advance(Duration::seconds(61));
	client.get("/api/classes").await.expect("Session inside the window should be refreshed.");

	assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn proactive_refresh_failure_surfaces_without_dispatch() {
	let clock = Arc::new(ManualClock::new(common::start()));
	let sessions = Sessions::broken(clock.clone(), None);
	let transport = Recording::new(Reply::json(200, json!([])));
	let client = common::client(transport.clone(), sessions.clone(), clock);
	let err = client.get("/api/welfare-cases").await.expect_err("Signed-out caller should fail.");

	assert!(matches!(err, Error::Request(RequestError { status: 401, .. })));
	assert!(err.is_unauthorized());
	assert_eq!(transport.dispatches(), 0);
	assert_eq!(sessions.refreshes(), 1);
}

#[tokio::test]
async fn concurrent_requests_share_one_reactive_refresh() {
	let transport = Recording::with_delay(
		Reply::json(200, json!({ "ok": true })),
		StdDuration::from_millis(10),
	);
	let (client, sessions, _) = common::signed_in_client(transport.clone());

	transport.enqueue(Reply::status(401, "Unauthorized"));
	transport.enqueue(Reply::status(401, "Unauthorized"));

	let (first, second) = tokio::join!(client.get("/api/wards"), client.get("/api/beds"));

	first.expect("First request should recover.");
	second.expect("Second request should recover.");

	assert_eq!(sessions.refreshes(), 1);
	assert_eq!(transport.dispatches(), 4);
}
