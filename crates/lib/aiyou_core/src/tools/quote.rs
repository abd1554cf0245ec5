//! `quote`: random quote from ZenQuotes.

use reqwest::Client;
use serde::Deserialize;

use super::{ToolError, json_body};

#[derive(Deserialize)]
struct Quote {
    q: String,
    a: String,
}

pub async fn random(client: &Client, base: &str) -> Result<String, ToolError> {
    let quotes: Vec<Quote> = json_body(
        client
            .get(format!("{}/api/random", base.trim_end_matches('/')))
            .send()
            .await?,
    )
    .await?;
    let quote = quotes
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::Unexpected("empty quote list".into()))?;
    Ok(format!("\"{}\" - {}", quote.q, quote.a))
}
