//! Boundary parsing: envelope → tagged operation.
//!
//! Each variant carries only what its branch needs, so missing fields fail
//! here with `BadRequest` before any store access.

use aiyou_core::auth::NULL_TOKEN;

use crate::error::{AppError, AppResult};
use crate::models::{ApiRequest, Credentials, Meta};

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Ingest {
        token: String,
        text: String,
        source: Option<String>,
    },
    Retrieve {
        token: String,
        text: String,
    },
    Reindex {
        token: String,
    },
    /// A missing token means the anonymous sentinel.
    CreateUser {
        token: String,
        credentials: Credentials,
    },
    Authenticate {
        credentials: Credentials,
    },
    Verify {
        token: String,
    },
    Refresh {
        token: String,
    },
}

impl Operation {
    /// Wire method name.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ingest { .. } => "ingest",
            Operation::Retrieve { .. } => "retrieve",
            Operation::Reindex { .. } => "index",
            Operation::CreateUser { .. } => "createUser",
            Operation::Authenticate { .. } => "authenticateUser",
            Operation::Verify { .. } => "verify",
            Operation::Refresh { .. } => "refresh",
        }
    }

    /// The token to authorize with; `None` for ungated operations.
    pub fn token(&self) -> Option<&str> {
        match self {
            Operation::Ingest { token, .. }
            | Operation::Retrieve { token, .. }
            | Operation::Reindex { token }
            | Operation::CreateUser { token, .. }
            | Operation::Verify { token }
            | Operation::Refresh { token } => Some(token),
            Operation::Authenticate { .. } => None,
        }
    }

    pub fn parse(request: ApiRequest) -> AppResult<Operation> {
        let meta = parse_meta(&request.meta)?;
        let op = match request.method.as_str() {
            "ingest" => Operation::Ingest {
                token: require_token(&meta)?,
                text: require_text(request.text)?,
                source: meta.chunk_source,
            },
            "retrieve" => Operation::Retrieve {
                token: require_token(&meta)?,
                text: require_text(request.text)?,
            },
            "index" => Operation::Reindex {
                token: require_token(&meta)?,
            },
            "createUser" => Operation::CreateUser {
                credentials: require_credentials(&meta)?,
                token: meta.token.unwrap_or_else(|| NULL_TOKEN.to_string()),
            },
            "authenticateUser" => Operation::Authenticate {
                credentials: require_credentials(&meta)?,
            },
            "verify" => Operation::Verify {
                token: require_token(&meta)?,
            },
            "refresh" => Operation::Refresh {
                token: require_token(&meta)?,
            },
            other => {
                return Err(AppError::BadRequest(format!("Invalid API method: {other}")));
            }
        };
        Ok(op)
    }
}

fn parse_meta(raw: &serde_json::Value) -> AppResult<Meta> {
    let parsed = match raw {
        serde_json::Value::Null => return Ok(Meta::default()),
        serde_json::Value::String(s) if s.trim().is_empty() => return Ok(Meta::default()),
        serde_json::Value::String(s) => serde_json::from_str(s),
        serde_json::Value::Object(_) => serde_json::from_value(raw.clone()),
        _ => return Err(AppError::BadRequest("meta must be a JSON object".into())),
    };
    parsed.map_err(|e| AppError::BadRequest(format!("invalid meta: {e}")))
}

fn require_token(meta: &Meta) -> AppResult<String> {
    meta.token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("token is required".into()))
}

fn require_text(text: Option<String>) -> AppResult<String> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("text is required".into()))
}

fn require_credentials(meta: &Meta) -> AppResult<Credentials> {
    match &meta.credentials {
        Some(c) if !c.email.trim().is_empty() && !c.password.is_empty() => Ok(Credentials {
            email: c.email.trim().to_string(),
            password: c.password.clone(),
        }),
        _ => Err(AppError::BadRequest("email and password are required".into())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(method: &str, text: Option<&str>, meta: serde_json::Value) -> ApiRequest {
        ApiRequest {
            text: text.map(str::to_string),
            method: method.to_string(),
            meta,
        }
    }

    #[test]
    fn meta_as_encoded_string() {
        let op = Operation::parse(request(
            "ingest",
            Some("hello"),
            json!("{\"token\":\"T\",\"chunk_source\":\"notes.md\"}"),
        ))
        .unwrap();
        assert_eq!(
            op,
            Operation::Ingest {
                token: "T".into(),
                text: "hello".into(),
                source: Some("notes.md".into()),
            }
        );
    }

    #[test]
    fn meta_as_object() {
        let op = Operation::parse(request("verify", None, json!({ "token": "T" }))).unwrap();
        assert_eq!(op, Operation::Verify { token: "T".into() });
    }

    #[test]
    fn create_user_defaults_to_sentinel() {
        let op = Operation::parse(request(
            "createUser",
            None,
            json!({ "credentials": { "email": "a@x.com", "password": "p" } }),
        ))
        .unwrap();
        assert_eq!(op.token(), Some(NULL_TOKEN));
    }

    #[test]
    fn authenticate_is_ungated() {
        let op = Operation::parse(request(
            "authenticateUser",
            None,
            json!({ "credentials": { "email": "a@x.com", "password": "p" } }),
        ))
        .unwrap();
        assert_eq!(op.token(), None);
        assert_eq!(op.name(), "authenticateUser");
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        let cases = [
            request("ingest", Some("x"), json!({})),
            request("ingest", None, json!({ "token": "T" })),
            request("retrieve", Some("   "), json!({ "token": "T" })),
            request("index", None, json!("")),
            request("createUser", None, json!({})),
            request(
                "authenticateUser",
                None,
                json!({ "credentials": { "email": "a@x.com", "password": "" } }),
            ),
            request("verify", None, json!("not json")),
            request("teleport", None, json!({})),
            request("refresh", None, json!(42)),
        ];
        for req in cases {
            let method = req.method.clone();
            assert!(
                matches!(Operation::parse(req), Err(AppError::BadRequest(_))),
                "{method} should be rejected"
            );
        }
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials {
            email: "a@x.com".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{c:?}").contains("hunter2"));
    }
}
