//! Lists patients through the portal request layer against a mocked backend, showing the cache
//! hit on a repeated read and the silent refresh-and-retry after an expired token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use portal_request::{
	ApiClient, RequestOptions,
	http::ReqwestTransport,
	reqwest::Client,
	session::{RefreshTokenProvider, Session},
};

#[derive(Debug, Deserialize)]
struct Patient {
	id: u32,
	name: String,
	ward: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/rest/v1/patients")
				.header("authorization", "Bearer demo-stale");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"JWT expired\"}");
		})
		.await;
	let patients = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/rest/v1/patients")
				.header("authorization", "Bearer demo-fresh");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":1,\"name\":\"Hana\",\"ward\":\"A\"},{\"id\":2,\"name\":\"Yusuf\",\"ward\":\"C\"}]",
			);
		})
		.await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-fresh\",\"expires_in\":3600}");
		})
		.await;
	// The https mock server uses a self-signed certificate.
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let provider: RefreshTokenProvider<ReqwestTransport> = RefreshTokenProvider::new(
		transport.clone(),
		Url::parse(&server.url("/auth/v1/token?grant_type=refresh_token"))?,
	)
	.with_header("apikey", "demo-anon-key");

	provider.seed(
		Session::new("demo-stale", OffsetDateTime::now_utc() + Duration::minutes(30)),
		Some("demo-refresh".into()),
	);

	let client = ApiClient::builder(Url::parse(&server.url("/rest/v1"))?)
		.session_provider(Arc::new(provider))
		.build_with_transport(Arc::new(transport))?;

	for round in 1..=2 {
		let listing: Vec<Patient> =
			client.api_request_as("/patients", RequestOptions::get()).await?;

		for patient in &listing {
			println!("Round {round}: #{} {} (ward {}).", patient.id, patient.name, patient.ward);
		}
	}

	println!("Cached entries: {}.", client.cache().len());
	println!("Session refreshes: {}.", client.tokens().metrics().attempts());

	expired.assert_async().await;
	patients.assert_async().await;
	token.assert_async().await;

	Ok(())
}
