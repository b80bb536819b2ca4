mod common;

// crates.io
use serde_json::{Value, json};
use time::Duration;
// self
use common::{Recording, Reply};
use portal_request::{Method, RequestOptions};

#[tokio::test]
async fn identical_get_within_ttl_is_served_from_cache() {
	let transport = Recording::new(Reply::json(200, json!([{ "id": 1, "name": "Hana" }])));
	let (client, _, _) = common::signed_in_client(transport.clone());
	let first = client.get("/api/patients").await.expect("First read should succeed.");
	let second = client.get("/api/patients").await.expect("Cached read should succeed.");

	assert_eq!(first, second);
	assert_eq!(transport.dispatches(), 1);
	assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn entry_expires_once_ttl_elapses() {
	let transport = Recording::new(Reply::json(200, json!({ "page": 1 })));
	let (client, _, clock) = common::signed_in_client(transport.clone());

	client.get("/api/schools").await.expect("Initial read should succeed.");
	clock.advance(Duration::seconds(599));
	client.get("/api/schools").await.expect("Read at t=599 should succeed.");

	assert_eq!(transport.dispatches(), 1);

	clock.advance(Duration::seconds(2));
	client.get("/api/schools").await.expect("Read at t=601 should succeed.");

	assert_eq!(transport.dispatches(), 2);
}

#[tokio::test]
async fn writes_never_touch_the_cache() {
	let transport = Recording::new(Reply::json(201, json!({ "id": 9 })));
	let (client, _, _) = common::signed_in_client(transport.clone());
	let body = json!({ "donor": "Lina", "amount": 250 });

	client.post("/api/donations", body.clone()).await.expect("First write should succeed.");
	client.post("/api/donations", body).await.expect("Second write should succeed.");

	assert_eq!(transport.dispatches(), 2);
	assert!(client.cache().is_empty());

	client
		.api_request("/api/donations", RequestOptions::with_method(Method::Post).no_cache())
		.await
		.expect("Write with no_cache should succeed.");

	assert!(client.cache().is_empty());
}

#[tokio::test]
async fn get_does_not_read_entries_written_by_another_method() {
	let transport = Recording::new(Reply::json(200, json!({ "ok": true })));
	let (client, _, _) = common::signed_in_client(transport.clone());

	client.get("/api/doctors").await.expect("Read should succeed.");
	client.delete("/api/doctors").await.expect("Delete should succeed.");

	assert_eq!(transport.dispatches(), 2);
}

#[tokio::test]
async fn no_cache_reads_always_dispatch() {
	let transport = Recording::new(Reply::json(200, json!({ "count": 3 })));
	let (client, _, _) = common::signed_in_client(transport.clone());

	for _ in 0..2 {
		client
			.api_request("/api/reports", RequestOptions::get().no_cache())
			.await
			.expect("Uncached read should succeed.");
	}

	assert_eq!(transport.dispatches(), 2);
	assert!(client.cache().is_empty());
}

#[tokio::test]
async fn failed_reads_are_not_cached() {
	let transport = Recording::new(Reply::json(200, json!({ "recovered": true })));
	let (client, _, _) = common::signed_in_client(transport.clone());

	transport.enqueue(Reply::json(503, json!({ "error": "Maintenance window" })));

	let err = client.get("/api/students").await.expect_err("503 should surface.");

	assert_eq!(err.status(), Some(503));
	assert!(client.cache().is_empty());
	assert_eq!(
		client.get("/api/students").await.expect("Retry by the caller should succeed."),
		json!({ "recovered": true })
	);
}

#[tokio::test]
async fn clear_cache_scopes_to_endpoint_prefix() {
	let transport = Recording::new(Reply::json(200, json!([])));
	let (client, _, _) = common::signed_in_client(transport.clone());

	for endpoint in ["/api/users?page=1", "/api/users?page=2", "/api/schools"] {
		client.get(endpoint).await.expect("Warm-up read should succeed.");
	}

	assert_eq!(client.clear_cache(Some("/api/users")), 2);
	assert_eq!(client.cache().len(), 1);

	client.get("/api/schools").await.expect("Untouched entry should still be served.");

	assert_eq!(transport.dispatches(), 3);

	client.get("/api/users?page=1").await.expect("Invalidated entry should be fetched again.");

	assert_eq!(transport.dispatches(), 4);
	assert_eq!(client.clear_cache(None), 2);
	assert!(client.cache().is_empty());
}

#[tokio::test]
async fn equal_bodies_with_different_key_order_share_an_entry() {
	let transport = Recording::new(Reply::json(200, json!({ "hits": 4 })));
	let (client, _, _) = common::signed_in_client(transport.clone());
	let a: Value = serde_json::from_str(r#"{"city":"Amman","age":{"min":5,"max":12}}"#)
		.expect("JSON fixture should parse.");
	let b: Value = serde_json::from_str(r#"{"age":{"max":12,"min":5},"city":"Amman"}"#)
		.expect("JSON fixture should parse.");

	client
		.api_request("/api/search", RequestOptions::get().json(a))
		.await
		.expect("First search should succeed.");
	client
		.api_request("/api/search", RequestOptions::get().json(b))
		.await
		.expect("Second search should succeed.");

	assert_eq!(transport.dispatches(), 1);
}
