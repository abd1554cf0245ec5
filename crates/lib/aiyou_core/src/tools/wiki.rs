//! `wiki-lookup`: Wikipedia REST page summary.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{ToolError, json_body};

#[derive(Deserialize)]
struct Summary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

pub async fn summary(client: &Client, base: &str, title: &str) -> Result<String, ToolError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| ToolError::Unexpected(format!("cannot-be-a-base URL: {base}")))?
        .pop_if_empty()
        .extend(["page", "summary", title.trim()]);

    let page: Summary = json_body(client.get(url).send().await?).await?;
    if page.extract.is_empty() {
        return Err(ToolError::NotFound(format!("no summary for {title}")));
    }
    Ok(format!("{}: {}", page.title, page.extract))
}
