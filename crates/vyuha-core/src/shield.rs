//! HTTP client for the policy oracle's session-check endpoint.
//!
//! `POST {base_url}/api/session/check` with a bearer key and a version
//! header. Any non-2xx status, transport failure or timeout is an `Err`; the
//! validation gate decides what that means.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{PolicyConfig, PolicyCredentials};
use crate::error::{Result, VyuhaError};
use crate::gate::{PolicyFlag, PolicyOracle, PolicyVerdict};

#[derive(Serialize)]
struct CheckMessage<'a> {
    role: &'static str,
    content: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    deployment_id: &'a str,
    messages: Vec<CheckMessage<'a>>,
    external_session_id: &'a str,
    include_context: bool,
    metadata: serde_json::Value,
}

pub struct HttpPolicyOracle {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    deployment_id: String,
    api_version: String,
}

impl HttpPolicyOracle {
    pub fn new(config: &PolicyConfig, credentials: PolicyCredentials) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/session/check", config.base_url.trim_end_matches('/')),
            api_key: credentials.api_key,
            deployment_id: credentials.deployment_id,
            api_version: config.api_version.clone(),
        })
    }
}

impl PolicyOracle for HttpPolicyOracle {
    fn check(
        &self,
        content: &str,
        session_id: &str,
        metadata: &serde_json::Value,
    ) -> Result<PolicyVerdict> {
        let body = CheckRequest {
            deployment_id: &self.deployment_id,
            messages: vec![CheckMessage {
                role: "assistant",
                content,
                metadata,
            }],
            external_session_id: session_id,
            include_context: false,
            metadata: serde_json::json!({ "environment": { "name": "vyuha-ai" } }),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("whitecircle-version", &self.api_version)
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            return Err(VyuhaError::PolicyOracle(format!(
                "check failed ({status}): {snippet}"
            )));
        }

        let raw: serde_json::Value = resp.json()?;
        parse_verdict(raw)
    }
}

/// Decode the oracle's response without ever losing a flag.
///
/// The top-level `flagged` is read from the raw JSON first, and any policy
/// reported as flagged also flags the verdict. Policy entries are decoded one
/// at a time; an entry that does not decode keeps its flag and is tagged by
/// its policy id. Only a body that is not a JSON object is an error.
fn parse_verdict(raw: serde_json::Value) -> Result<PolicyVerdict> {
    let Some(obj) = raw.as_object() else {
        return Err(VyuhaError::MalformedResponse(
            "policy oracle response is not a JSON object".to_string(),
        ));
    };

    let mut policies = BTreeMap::new();
    if let Some(entries) = obj.get("policies").and_then(|p| p.as_object()) {
        for (id, entry) in entries {
            let flag = match PolicyFlag::deserialize(entry) {
                Ok(flag) => flag,
                Err(e) => {
                    tracing::warn!(policy = %id, error = %e, "unreadable policy entry");
                    PolicyFlag {
                        name: None,
                        flagged: entry
                            .get("flagged")
                            .and_then(|f| f.as_bool())
                            .unwrap_or(true),
                        flagged_source: Vec::new(),
                    }
                }
            };
            policies.insert(id.clone(), flag);
        }
    }

    let flagged = obj.get("flagged").and_then(|f| f.as_bool()).unwrap_or(false)
        || policies.values().any(|p| p.flagged);

    Ok(PolicyVerdict {
        flagged,
        policies,
        internal_session_id: obj
            .get("internal_session_id")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}
