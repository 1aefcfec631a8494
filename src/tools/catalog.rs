//! Tool catalog
//!
//! An immutable copy of the registry's descriptors, taken at session start.
//! Tools registered or removed later do not change a running session's view.

use crate::error::{LedgerError, Result};
use crate::llm::{ToolCall, ToolDefinition};

use super::definition::ToolDescriptor;

/// Catalog of tool descriptors, ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from descriptors
    pub fn from_descriptors(mut tools: Vec<ToolDescriptor>) -> Self {
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Self { tools }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List all tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Get all tools
    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function descriptors for the reasoning collaborator
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_llm_definition()).collect()
    }

    /// One line per tool: signature and description
    pub fn render(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.signature(), t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check a tool call against this catalog
    pub fn validate_call(&self, call: &ToolCall) -> Result<&ToolDescriptor> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| LedgerError::Validation(unknown_tool_message(&call.name, &self.names())))?;
        tool.validate(&call.input)?;
        Ok(tool)
    }
}

/// Message for a call naming a tool outside the catalog
pub(crate) fn unknown_tool_message(name: &str, available: &[&str]) -> String {
    format!("Unknown tool: {}. Available tools: {}", name, available.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ParamType;
    use serde_json::json;

    fn sample_catalog() -> ToolCatalog {
        ToolCatalog::from_descriptors(vec![
            ToolDescriptor::new("search_ledger", "Find ledgers by partial name").with_param(
                "partial_name",
                ParamType::String,
                "Part of the name",
            ),
            ToolDescriptor::new("get_sundry_debtors", "Customers who owe money"),
        ])
    }

    #[test]
    fn test_new_catalog_is_empty() {
        let catalog = ToolCatalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.render(), "");
    }

    #[test]
    fn test_sorted_by_name() {
        assert_eq!(sample_catalog().names(), vec!["get_sundry_debtors", "search_ledger"]);
    }

    #[test]
    fn test_get_and_contains() {
        let catalog = sample_catalog();
        assert!(catalog.contains("search_ledger"));
        assert!(!catalog.contains("get_weather"));
        assert_eq!(catalog.get("get_sundry_debtors").unwrap().description, "Customers who owe money");
    }

    #[test]
    fn test_render() {
        let rendered = sample_catalog().render();
        assert_eq!(
            rendered,
            "- get_sundry_debtors(): Customers who owe money\n\
             - search_ledger(partial_name: string): Find ledgers by partial name"
        );
    }

    #[test]
    fn test_definitions() {
        let defs = sample_catalog().definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].name, "search_ledger");
    }

    #[test]
    fn test_validate_call_unknown_tool() {
        let call = ToolCall::new("1", "get_weather", json!({}));
        let err = sample_catalog().validate_call(&call).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Validation failed: Unknown tool: get_weather. Available tools: get_sundry_debtors, search_ledger"
        );
    }

    #[test]
    fn test_validate_call_bad_args() {
        let call = ToolCall::new("1", "search_ledger", json!({}));
        assert!(sample_catalog().validate_call(&call).is_err());
    }

    #[test]
    fn test_validate_call_ok() {
        let call = ToolCall::new("1", "search_ledger", json!({"partial_name": "cash"}));
        let catalog = sample_catalog();
        let tool = catalog.validate_call(&call).unwrap();
        assert_eq!(tool.name, "search_ledger");
    }
}
