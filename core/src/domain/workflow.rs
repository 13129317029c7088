// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Workflow Registry Record — the catalog entry the Admission Gate resolves
//! against. Owned by the (out-of-scope) catalog importer; read-only here.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Workflow,
    DataProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sync,
    Async,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub name: String,
    pub function_name: String,
    pub path: String,
    pub workflow_type: WorkflowType,
    pub parameters_schema: Vec<ParameterSpec>,
    pub schedule: Option<String>,
    pub timeout_seconds: u64,
    pub execution_mode: ExecutionMode,
    pub endpoint_enabled: bool,
    pub allowed_methods: Vec<String>,
    pub organization_id: Option<Uuid>,
    pub time_saved: Option<f64>,
    pub value: Option<f64>,
    pub api_key_hash: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required parameter '{0}'")]
    MissingRequired(String),
    #[error("parameter '{name}' expected type {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl WorkflowRecord {
    /// Validate a raw parameter map against `parameters_schema`, applying
    /// defaults for missing optional parameters. Runs at admission
    /// (`spec.md` §9, "Dynamic/duck-typed parameter passing").
    pub fn validate_parameters(
        &self,
        input: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ValidationError> {
        let mut resolved = serde_json::Map::new();
        for spec in &self.parameters_schema {
            match input.get(&spec.name) {
                Some(value) => {
                    check_type(&spec.name, &spec.param_type, value)?;
                    resolved.insert(spec.name.clone(), value.clone());
                }
                None => {
                    if let Some(default) = &spec.default {
                        resolved.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        return Err(ValidationError::MissingRequired(spec.name.clone()));
                    }
                }
            }
        }
        Ok(serde_json::Value::Object(resolved))
    }
}

fn check_type(name: &str, expected: &str, value: &serde_json::Value) -> Result<(), ValidationError> {
    let matches = match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true, // unknown schema types are passed through unchecked
    };
    if matches {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            actual: describe(value).to_string(),
        })
    }
}

fn describe(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(schema: Vec<ParameterSpec>) -> WorkflowRecord {
        WorkflowRecord {
            id: WorkflowId::new(),
            name: "demo".to_string(),
            function_name: "run".to_string(),
            path: "workflows/demo.py".to_string(),
            workflow_type: WorkflowType::Workflow,
            parameters_schema: schema,
            schedule: None,
            timeout_seconds: 30,
            execution_mode: ExecutionMode::Async,
            endpoint_enabled: true,
            allowed_methods: vec!["POST".to_string()],
            organization_id: None,
            time_saved: None,
            value: None,
            api_key_hash: None,
            is_active: true,
        }
    }

    #[test]
    fn missing_required_param_rejected() {
        let wf = workflow(vec![ParameterSpec {
            name: "x".to_string(),
            param_type: "number".to_string(),
            required: true,
            default: None,
        }]);
        let err = wf.validate_parameters(&serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingRequired(n) if n == "x"));
    }

    #[test]
    fn default_applied_when_absent() {
        let wf = workflow(vec![ParameterSpec {
            name: "limit".to_string(),
            param_type: "number".to_string(),
            required: false,
            default: Some(serde_json::json!(10)),
        }]);
        let resolved = wf.validate_parameters(&serde_json::Map::new()).unwrap();
        assert_eq!(resolved["limit"], serde_json::json!(10));
    }

    #[test]
    fn type_mismatch_rejected() {
        let wf = workflow(vec![ParameterSpec {
            name: "x".to_string(),
            param_type: "number".to_string(),
            required: true,
            default: None,
        }]);
        let mut input = serde_json::Map::new();
        input.insert("x".to_string(), serde_json::json!("not a number"));
        let err = wf.validate_parameters(&input).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }
}
