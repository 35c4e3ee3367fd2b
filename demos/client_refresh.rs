//! Demonstrates the refresh client against a stand-in broker: the first call fetches a
//! credential, the second reuses the cached one, and `authorize` signs a downstream request.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
// self
use app_token_broker::{
	client::{ClientConfig, CredentialClient},
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let broker = MockServer::start_async().await;
	let expires_at = (OffsetDateTime::now_utc() + Duration::hours(1)).format(&Rfc3339)?;
	let token_mock = broker
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.query_param("app-id", "123456")
				.query_param("installation-id", "987654");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"token\":\"ghs_demo\",\"expires_at\":\"{expires_at}\"}}"));
		})
		.await;
	let config = ClientConfig::new(broker.base_url(), 123_456, 987_654);
	let client = CredentialClient::new(&config)?;
	let first = client.credential().await?;
	let second = client.credential().await?;

	println!("Credential {} expires at {}.", first.token.fingerprint(), first.expires_at);
	println!("Second call reused the cache: {}.", first == second);

	let downstream = Client::new().get(broker.url("/repos/acme/app"));
	let request = client.authorize(downstream).await?.build()?;

	println!("Downstream request carries {} header(s).", request.headers().len());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
