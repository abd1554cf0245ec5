//! `code-exec`: sandboxed execution through a Piston server.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ToolError, json_body};

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'static str,
    files: [SourceFile<'a>; 1],
}

#[derive(Serialize)]
struct SourceFile<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    run: RunResult,
}

#[derive(Deserialize)]
struct RunResult {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    code: Option<i32>,
}

pub async fn execute(
    client: &Client,
    base: &str,
    language: &str,
    code: &str,
) -> Result<String, ToolError> {
    let url = format!("{}/execute", base.trim_end_matches('/'));
    let resp = client
        .post(url)
        .json(&ExecuteRequest {
            language,
            version: "*",
            files: [SourceFile { content: code }],
        })
        .send()
        .await?;
    let result: ExecuteResponse = json_body(resp).await?;
    let run = result.run;

    match run.code {
        Some(0) | None => Ok(run.stdout.trim_end().to_string()),
        Some(status) => Ok(format!(
            "exited with status {status}\n{}",
            run.stderr.trim_end()
        )),
    }
}
