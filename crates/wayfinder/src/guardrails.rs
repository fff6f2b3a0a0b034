//! Confirmation gate for destructive operations.

use serde::Serialize;

/// Methods treated as destructive unless overridden.
pub const DEFAULT_DESTRUCTIVE_METHODS: &[&str] = &["DELETE", "PUT", "PATCH"];

/// Outcome of a guardrail check.
#[derive(Debug, Clone, Serialize)]
pub struct GuardrailVerdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Blocks destructive operations until explicitly confirmed.
#[derive(Debug, Clone)]
pub struct Guardrails {
    destructive_methods: Vec<String>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Guardrails::with_methods(DEFAULT_DESTRUCTIVE_METHODS)
    }
}

impl Guardrails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(methods: &[&str]) -> Self {
        Guardrails {
            destructive_methods: methods.iter().map(|m| m.to_uppercase()).collect(),
        }
    }

    pub fn is_destructive(&self, method: &str) -> bool {
        self.destructive_methods
            .iter()
            .any(|m| m == &method.to_uppercase())
    }

    /// Safe methods always pass; destructive ones need `confirmed`.
    pub fn check_operation(&self, method: &str, path: &str, confirmed: bool) -> GuardrailVerdict {
        if !self.is_destructive(method) || confirmed {
            return GuardrailVerdict {
                allowed: true,
                warning: None,
            };
        }

        GuardrailVerdict {
            allowed: false,
            warning: Some(format!(
                "This is a destructive operation ({} {}). Confirm it explicitly to proceed.",
                method.to_uppercase(),
                path
            )),
        }
    }
}
