//! Tool registry: the closed set of tools the CRAG pipeline can call.
//!
//! Each [`ToolKind`] declares its parameter contract (used only to inform
//! the chat provider's structured-output request) and parses provider
//! arguments into a typed [`Tool`]. Invocation never fails past the registry:
//! every error, including timeouts, becomes a human-readable failure string.
//! Unknown tool names are reported as `None` so the caller can skip them.

pub mod code;
pub mod currency;
pub mod quote;
pub mod timezone;
pub mod weather;
pub mod wiki;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::llm::ToolCall;

/// Errors raised inside a tool; always rendered to a string by the registry.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Provider-facing tool declaration (`{"type": "function", "function": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: ParametersSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: Vec<&'static str>,
    pub properties: BTreeMap<&'static str, PropertySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
}

/// A declared tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct ToolParam {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
}

const fn param(
    name: &'static str,
    kind: &'static str,
    required: bool,
    description: &'static str,
) -> ToolParam {
    ToolParam {
        name,
        kind,
        required,
        description,
    }
}

/// The known tool kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WikiLookup,
    CodeExec,
    Weather,
    Currency,
    Quote,
    Timezone,
}

const WIKI_PARAMS: &[ToolParam] = &[param(
    "article_title",
    "string",
    true,
    "The title of the article to search for on Wikipedia",
)];

const CODE_PARAMS: &[ToolParam] = &[
    param("code", "string", true, "The source code to execute"),
    param(
        "language",
        "string",
        false,
        "Programming language of the code (default: javascript)",
    ),
];

const WEATHER_PARAMS: &[ToolParam] = &[param("city", "string", true, "Name of the city")];

const CURRENCY_PARAMS: &[ToolParam] = &[
    param("from", "string", true, "ISO 4217 code to convert from, e.g. USD"),
    param("to", "string", true, "ISO 4217 code to convert to, e.g. EUR"),
    param("amount", "number", false, "Amount to convert (default: 1)"),
];

const TIMEZONE_PARAMS: &[ToolParam] = &[param(
    "timezone",
    "string",
    true,
    "IANA timezone name, e.g. Europe/London",
)];

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::WikiLookup,
        ToolKind::CodeExec,
        ToolKind::Weather,
        ToolKind::Currency,
        ToolKind::Quote,
        ToolKind::Timezone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WikiLookup => "wiki-lookup",
            ToolKind::CodeExec => "code-exec",
            ToolKind::Weather => "weather",
            ToolKind::Currency => "currency",
            ToolKind::Quote => "quote",
            ToolKind::Timezone => "timezone",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::WikiLookup => "Retrieve summary on topic from Wikipedia",
            ToolKind::CodeExec => {
                "Execute code / function / expression in an isolated environment and return the result"
            }
            ToolKind::Weather => "Get the current weather for a city",
            ToolKind::Currency => "Convert an amount between two currencies at the latest rate",
            ToolKind::Quote => "Fetch a random inspirational quote",
            ToolKind::Timezone => "Get the current local time in an IANA timezone",
        }
    }

    pub fn params(self) -> &'static [ToolParam] {
        match self {
            ToolKind::WikiLookup => WIKI_PARAMS,
            ToolKind::CodeExec => CODE_PARAMS,
            ToolKind::Weather => WEATHER_PARAMS,
            ToolKind::Currency => CURRENCY_PARAMS,
            ToolKind::Quote => &[],
            ToolKind::Timezone => TIMEZONE_PARAMS,
        }
    }

    pub fn schema(self) -> ToolSchema {
        let params = self.params();
        ToolSchema {
            kind: "function",
            function: FunctionSchema {
                name: self.name(),
                description: self.description(),
                parameters: ParametersSchema {
                    kind: "object",
                    required: params.iter().filter(|p| p.required).map(|p| p.name).collect(),
                    properties: params
                        .iter()
                        .map(|p| {
                            (
                                p.name,
                                PropertySchema {
                                    kind: p.kind,
                                    description: p.description,
                                },
                            )
                        })
                        .collect(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WikiParams {
    pub article_title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeParams {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "javascript".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherParams {
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrencyParams {
    pub from: String,
    pub to: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

fn default_amount() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimezoneParams {
    pub timezone: String,
}

/// A parsed tool invocation with typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Tool {
    WikiLookup(WikiParams),
    CodeExec(CodeParams),
    Weather(WeatherParams),
    Currency(CurrencyParams),
    Quote,
    Timezone(TimezoneParams),
}

/// Why a tool call could not be turned into a [`Tool`].
#[derive(Debug, Error, PartialEq)]
pub enum ToolParseError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
}

fn parse_args<T: DeserializeOwned>(
    kind: ToolKind,
    arguments: &serde_json::Value,
) -> Result<T, ToolParseError> {
    // Some models send arguments as a JSON-encoded string.
    let value = match arguments {
        serde_json::Value::String(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone()))
        }
        serde_json::Value::Null => serde_json::json!({}),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| ToolParseError::InvalidArguments {
        tool: kind.name(),
        reason: e.to_string(),
    })
}

impl Tool {
    pub fn parse(call: &ToolCall) -> Result<Tool, ToolParseError> {
        let kind =
            ToolKind::from_name(&call.name).ok_or_else(|| ToolParseError::Unknown(call.name.clone()))?;
        let args = &call.arguments;
        Ok(match kind {
            ToolKind::WikiLookup => Tool::WikiLookup(parse_args(kind, args)?),
            ToolKind::CodeExec => Tool::CodeExec(parse_args(kind, args)?),
            ToolKind::Weather => Tool::Weather(parse_args(kind, args)?),
            ToolKind::Currency => Tool::Currency(parse_args(kind, args)?),
            ToolKind::Quote => Tool::Quote,
            ToolKind::Timezone => Tool::Timezone(parse_args(kind, args)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::WikiLookup(_) => ToolKind::WikiLookup,
            Tool::CodeExec(_) => ToolKind::CodeExec,
            Tool::Weather(_) => ToolKind::Weather,
            Tool::Currency(_) => ToolKind::Currency,
            Tool::Quote => ToolKind::Quote,
            Tool::Timezone(_) => ToolKind::Timezone,
        }
    }
}

/// Base URLs of the public APIs behind each tool.
#[derive(Debug, Clone)]
pub struct ToolEndpoints {
    pub wikipedia: String,
    pub piston: String,
    pub geocoding: String,
    pub forecast: String,
    pub frankfurter: String,
    pub zenquotes: String,
    pub worldtime: String,
}

impl Default for ToolEndpoints {
    fn default() -> Self {
        Self {
            wikipedia: "https://en.wikipedia.org/api/rest_v1".into(),
            piston: "https://emkc.org/api/v2/piston".into(),
            geocoding: "https://geocoding-api.open-meteo.com".into(),
            forecast: "https://api.open-meteo.com".into(),
            frankfurter: "https://api.frankfurter.app".into(),
            zenquotes: "https://zenquotes.io".into(),
            worldtime: "https://worldtimeapi.org".into(),
        }
    }
}

impl ToolEndpoints {
    /// Defaults overridden by `TOOL_<NAME>_URL` variables
    /// (`WIKIPEDIA`, `PISTON`, `GEOCODING`, `FORECAST`, `FRANKFURTER`,
    /// `ZENQUOTES`, `WORLDTIME`).
    pub fn from_env() -> Self {
        let d = Self::default();
        let var = |name: &str, default: String| {
            std::env::var(format!("TOOL_{name}_URL"))
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        Self {
            wikipedia: var("WIKIPEDIA", d.wikipedia),
            piston: var("PISTON", d.piston),
            geocoding: var("GEOCODING", d.geocoding),
            forecast: var("FORECAST", d.forecast),
            frankfurter: var("FRANKFURTER", d.frankfurter),
            zenquotes: var("ZENQUOTES", d.zenquotes),
            worldtime: var("WORLDTIME", d.worldtime),
        }
    }

    /// Every endpoint under one base URL, for tests against a mock server.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            wikipedia: format!("{base}/wiki"),
            piston: format!("{base}/piston"),
            geocoding: format!("{base}/geocoding"),
            forecast: format!("{base}/forecast"),
            frankfurter: format!("{base}/frankfurter"),
            zenquotes: format!("{base}/zenquotes"),
            worldtime: format!("{base}/worldtime"),
        }
    }
}

/// The seam the CRAG orchestrator calls tools through.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Declarations offered to the chat provider.
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Run one call. `None` means the tool name is unknown and was skipped;
    /// `Some` carries the tool's output or a failure description.
    async fn invoke(&self, call: &ToolCall) -> Option<String>;
}

/// The registry of built-in HTTP tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    client: Client,
    endpoints: ToolEndpoints,
    call_timeout: Duration,
}

impl ToolRegistry {
    pub fn new(endpoints: ToolEndpoints, call_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            call_timeout,
        }
    }

    async fn run(&self, tool: &Tool) -> Result<String, ToolError> {
        let client = &self.client;
        let ep = &self.endpoints;
        match tool {
            Tool::WikiLookup(p) => wiki::summary(client, &ep.wikipedia, &p.article_title).await,
            Tool::CodeExec(p) => code::execute(client, &ep.piston, &p.language, &p.code).await,
            Tool::Weather(p) => weather::current(client, &ep.geocoding, &ep.forecast, &p.city).await,
            Tool::Currency(p) => {
                currency::convert(client, &ep.frankfurter, &p.from, &p.to, p.amount).await
            }
            Tool::Quote => quote::random(client, &ep.zenquotes).await,
            Tool::Timezone(p) => timezone::now_in(client, &ep.worldtime, &p.timezone).await,
        }
    }

    /// Run a parsed tool, converting every failure into a display string.
    pub async fn execute(&self, tool: &Tool) -> String {
        let name = tool.kind().name();
        match timeout(self.call_timeout, self.run(tool)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "tool failed");
                format!("Tool {name} failed: {e}")
            }
            Err(_) => {
                warn!(tool = name, timeout = ?self.call_timeout, "tool timed out");
                format!("Tool {name} timed out after {}s", self.call_timeout.as_secs())
            }
        }
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    fn schemas(&self) -> Vec<ToolSchema> {
        ToolKind::ALL.into_iter().map(ToolKind::schema).collect()
    }

    async fn invoke(&self, call: &ToolCall) -> Option<String> {
        match Tool::parse(call) {
            Ok(tool) => {
                debug!(tool = %call.name, "invoking tool");
                Some(self.execute(&tool).await)
            }
            Err(ToolParseError::Unknown(name)) => {
                warn!(tool = %name, "unknown tool requested; skipping");
                None
            }
            Err(e) => Some(e.to_string()),
        }
    }
}

/// Fail on non-2xx, then decode JSON.
pub(crate) async fn json_body<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ToolError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ToolError::NotFound(resp.url().path().to_string()));
    }
    if !status.is_success() {
        return Err(ToolError::Status(status));
    }
    Ok(resp.json::<T>().await?)
}
