//! Wire types exchanged with the Vbook app

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Script language understood by the app's test endpoint
pub const SCRIPT_LANGUAGE: &str = "javascript";

/// Payload of a `GET /test` request, carried base64-encoded in the `data` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    /// Base URL of the local file server, e.g. `http://192.168.1.20:8070`
    pub ip: String,
    /// Extension source folder relative to the served root, e.g. `my-ext/src`
    pub root: String,
    pub language: String,
    /// Full text of the script under test
    pub script: String,
    /// One inner list per parameter
    pub input: Vec<Vec<String>>,
}

impl TestRequest {
    pub fn new(
        ip: impl Into<String>,
        root: impl Into<String>,
        script: impl Into<String>,
        input: Vec<Vec<String>>,
    ) -> Self {
        Self {
            ip: ip.into(),
            root: root.into(),
            language: SCRIPT_LANGUAGE.to_string(),
            script: script.into(),
            input,
        }
    }

    /// Convert raw parameter strings into the nested input shape.
    ///
    /// A parameter containing commas becomes one inner list of its trimmed
    /// parts; any other parameter becomes a single-element list. No
    /// parameters yields one empty inner list.
    pub fn input_from_params(params: &[String]) -> Vec<Vec<String>> {
        if params.is_empty() {
            return vec![Vec::new()];
        }

        params
            .iter()
            .map(|param| {
                if param.contains(',') {
                    param.split(',').map(|part| part.trim().to_string()).collect()
                } else {
                    vec![param.trim().to_string()]
                }
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.ip.is_empty() {
            return Err(Error::validation("ip", "is required"));
        }
        if self.root.is_empty() {
            return Err(Error::validation("root", "is required"));
        }
        if self.language.is_empty() {
            return Err(Error::validation("language", "is required"));
        }
        if self.script.is_empty() {
            return Err(Error::validation("script", "content is required"));
        }
        Ok(())
    }
}

/// Result of a test run as reported by the app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
    /// Every top-level field of the app's JSON answer, including unnamed ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl TestResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: message.into(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Detail fields other than `status`, `output` and `error`
    pub fn extra_details(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.details
            .iter()
            .flat_map(|map| map.iter())
            .filter(|(key, _)| !matches!(key.as_str(), "status" | "output" | "error"))
    }

    /// JSON object as the app sends it: named fields plus any extra details
    pub fn to_wire_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(details) = &self.details {
            map.extend(details.clone());
        }
        map.insert("status".to_string(), Value::String(self.status.clone()));
        map.insert("output".to_string(), Value::String(self.output.clone()));
        map.insert("error".to_string(), Value::String(self.error.clone()));
        Value::Object(map)
    }
}
