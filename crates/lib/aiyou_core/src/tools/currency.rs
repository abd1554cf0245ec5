//! `currency`: conversion at the latest ECB rate via Frankfurter.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use super::{ToolError, json_body};

#[derive(Deserialize)]
struct LatestResponse {
    date: String,
    rates: HashMap<String, f64>,
}

pub async fn convert(
    client: &Client,
    base: &str,
    from: &str,
    to: &str,
    amount: f64,
) -> Result<String, ToolError> {
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();
    if from == to {
        return Ok(format!("{amount:.2} {from} = {amount:.2} {to}"));
    }

    let latest: LatestResponse = json_body(
        client
            .get(format!("{}/latest", base.trim_end_matches('/')))
            .query(&[
                ("amount", amount.to_string()),
                ("from", from.clone()),
                ("to", to.clone()),
            ])
            .send()
            .await?,
    )
    .await?;

    let converted = latest
        .rates
        .get(&to)
        .ok_or_else(|| ToolError::Unexpected(format!("no rate for {to}")))?;
    Ok(format!(
        "{amount:.2} {from} = {converted:.2} {to} (rate date {})",
        latest.date
    ))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn converts_with_upper_cased_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amount": 10.0,
                "base": "USD",
                "date": "2026-10-16",
                "rates": { "EUR": 9.21 }
            })))
            .mount(&server)
            .await;

        let out = convert(&Client::new(), &server.uri(), "usd", "eur", 10.0)
            .await
            .unwrap();
        assert_eq!(out, "10.00 USD = 9.21 EUR (rate date 2026-10-16)");
    }

    #[tokio::test]
    async fn same_currency_needs_no_request() {
        let out = convert(&Client::new(), "http://127.0.0.1:9", "EUR", "eur", 3.0)
            .await
            .unwrap();
        assert_eq!(out, "3.00 EUR = 3.00 EUR");
    }

    #[tokio::test]
    async fn bad_request_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        assert!(matches!(
            convert(&Client::new(), &server.uri(), "XXX", "EUR", 1.0).await,
            Err(ToolError::Status(_))
        ));
    }
}
