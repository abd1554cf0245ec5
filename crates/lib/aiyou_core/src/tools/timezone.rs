//! `timezone`: current local time from WorldTimeAPI.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{ToolError, json_body};

#[derive(Deserialize)]
struct TimeResponse {
    datetime: String,
    utc_offset: String,
    #[serde(default)]
    abbreviation: Option<String>,
}

pub async fn now_in(client: &Client, base: &str, zone: &str) -> Result<String, ToolError> {
    let zone = zone.trim().trim_matches('/');
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| ToolError::Unexpected(format!("cannot-be-a-base URL: {base}")))?
        .pop_if_empty()
        .push("api")
        .push("timezone")
        .extend(zone.split('/'));

    let time: TimeResponse = json_body(client.get(url).send().await?).await?;
    let abbr = time
        .abbreviation
        .map(|a| format!(" {a}"))
        .unwrap_or_default();
    Ok(format!(
        "Current time in {zone}: {} (UTC{}{abbr})",
        time.datetime, time.utc_offset
    ))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn area_and_location_become_path_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timezone/Europe/London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "datetime": "2026-10-19T14:03:00.000000+01:00",
                "utc_offset": "+01:00",
                "abbreviation": "BST"
            })))
            .mount(&server)
            .await;

        let out = now_in(&Client::new(), &server.uri(), "Europe/London")
            .await
            .unwrap();
        assert_eq!(
            out,
            "Current time in Europe/London: 2026-10-19T14:03:00.000000+01:00 (UTC+01:00 BST)"
        );
    }

    #[tokio::test]
    async fn unknown_zone_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(matches!(
            now_in(&Client::new(), &server.uri(), "Mars/Olympus").await,
            Err(ToolError::NotFound(_))
        ));
    }
}
