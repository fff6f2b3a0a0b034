use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single operation parameter.
///
/// `location` is kept as a plain string: well-formed documents use
/// `path`, `query`, `header`, or `cookie`, but Swagger 2.0 also puts the
/// request body in a parameter with `in: body`, and loose documents
/// invent their own values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Where the parameter lives (`in` field of the source document).
    pub location: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameter schema with `$ref`s inlined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// One callable operation: a (path, HTTP method) pair with its
/// parameters and schemas fully inlined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Path template (e.g. "/pets/{petId}").
    pub path: String,
    /// HTTP method, always uppercase.
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// JSON request body schema, `$ref`s inlined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body_schema: Option<Value>,
    /// Schema of the first success response (200, 201, or default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    /// Security requirements, passed through verbatim.
    #[serde(default)]
    pub security: Vec<Value>,
}

impl Endpoint {
    /// Identity key within one catalog: `METHOD:path`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.path)
    }
}

/// A fully parsed specification.
///
/// Built by exactly one resolve call and never mutated afterwards;
/// re-registering an API replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSpec {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl ParsedSpec {
    /// Placeholder spec recorded when a registration fails, so the API
    /// still shows up in listings with zero endpoints.
    pub fn placeholder(name: &str, reason: &str) -> Self {
        ParsedSpec {
            title: name.to_string(),
            version: "unknown".to_string(),
            description: Some(format!("Failed to load spec: {reason}")),
            endpoints: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_key_is_method_and_path() {
        let endpoint = Endpoint {
            path: "/pets/{petId}".to_string(),
            method: "GET".to_string(),
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body_schema: None,
            response_schema: None,
            security: Vec::new(),
        };
        assert_eq!(endpoint.key(), "GET:/pets/{petId}");
    }

    #[test]
    fn placeholder_carries_failure_reason() {
        let spec = ParsedSpec::placeholder("petstore", "connection refused");
        assert_eq!(spec.title, "petstore");
        assert_eq!(spec.version, "unknown");
        assert!(spec.endpoints.is_empty());
        let description = spec.description.unwrap();
        assert!(description.contains("connection refused"));
    }
}
