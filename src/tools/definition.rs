//! Tool descriptors and argument validation
//!
//! A descriptor declares a tool's name, description, and typed parameters.
//! The JSON schema sent to the model and the checks applied to incoming
//! arguments are both derived from the same parameter table.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{LedgerError, Result};
use crate::llm::ToolDefinition;

/// Date format used by every date argument (e.g. `20250701`)
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// A string in YYYYMMDD form
    Date,
}

impl ParamType {
    /// JSON schema `type` for this parameter
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Date => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Short phrase used in validation messages
    pub fn expectation(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Date => "a date in YYYYMMDD format",
        }
    }

    /// Check whether a value satisfies this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Date => value.as_str().is_some_and(|s| parse_date(s).is_ok()),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// A tool's published metadata. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name (e.g., "get_sundry_debtors")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// Parameters by name
    pub params: BTreeMap<String, ParamSpec>,
    /// Whether successful results are written to the snapshot store
    pub cacheable: bool,
    /// Per-tool live fetch budget, overriding the registry default
    pub timeout: Option<Duration>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: BTreeMap::new(),
            cacheable: true,
            timeout: None,
        }
    }

    /// Add a required parameter
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                param_type,
                description: description.into(),
                required: true,
            },
        );
        self
    }

    /// Add an optional parameter
    pub fn with_optional_param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                param_type,
                description: description.into(),
                required: false,
            },
        );
        self
    }

    /// Never write results to the snapshot store
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// JSON schema for the parameters
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.params {
            let description = match spec.param_type {
                ParamType::Date => format!("{} (YYYYMMDD)", spec.description),
                _ => spec.description.clone(),
            };
            properties.insert(
                name.clone(),
                json!({"type": spec.param_type.json_type(), "description": description}),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Convert to LLM ToolDefinition for API calls
    pub fn to_llm_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name.clone(), self.description.clone(), self.input_schema())
    }

    /// Call signature, e.g. `search_ledger(partial_name: string)`
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .params
            .iter()
            .map(|(name, spec)| {
                let optional = if spec.required { "" } else { "?" };
                let ty = match spec.param_type {
                    ParamType::Date => "YYYYMMDD",
                    other => other.json_type(),
                };
                format!("{}{}: {}", name, optional, ty)
            })
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }

    /// Validate call arguments against the declared parameters.
    ///
    /// A null argument value is treated as an empty object.
    pub fn validate(&self, args: &Value) -> Result<()> {
        let empty = Map::new();
        let map = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => {
                return Err(LedgerError::Validation(format!(
                    "{}: arguments must be an object",
                    self.name
                )));
            }
        };

        for (name, spec) in &self.params {
            if spec.required && map.get(name).is_none_or(Value::is_null) {
                return Err(LedgerError::Validation(format!(
                    "{}: missing required argument '{}'",
                    self.name, name
                )));
            }
        }

        for (key, value) in map {
            let Some(spec) = self.params.get(key) else {
                return Err(LedgerError::Validation(format!(
                    "{}: unknown argument '{}'",
                    self.name, key
                )));
            };
            if !value.is_null() && !spec.param_type.accepts(value) {
                return Err(LedgerError::Validation(format!(
                    "{}: argument '{}' must be {}",
                    self.name,
                    key,
                    spec.param_type.expectation()
                )));
            }
        }

        Ok(())
    }

    /// Canonical snapshot key for a call.
    ///
    /// The bare name when no declared argument is present, otherwise
    /// `name[k=v,...]` with arguments in name order.
    pub fn cache_key(&self, args: &Value) -> String {
        let parts: Vec<String> = self
            .params
            .keys()
            .filter_map(|name| {
                let value = args.get(name).filter(|v| !v.is_null())?;
                let rendered = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                Some(format!("{}={}", name, rendered))
            })
            .collect();

        if parts.is_empty() {
            self.name.clone()
        } else {
            format!("{}[{}]", self.name, parts.join(","))
        }
    }
}

/// Parse a YYYYMMDD date argument
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::Validation(format!("'{}' is not a YYYYMMDD date", raw)));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| LedgerError::Validation(format!("'{}' is not a valid date: {}", raw, e)))
}

/// Read a string argument, empty when absent
pub fn str_arg<'a>(args: &'a Value, name: &str) -> &'a str {
    args.get(name).and_then(Value::as_str).unwrap_or("")
}
