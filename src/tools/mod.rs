//! Tool System - descriptors, the session catalog, and the live-or-cache registry

mod catalog;
mod definition;
mod registry;
mod result;

pub use catalog::ToolCatalog;
pub use definition::{DATE_FORMAT, ParamSpec, ParamType, ToolDescriptor, parse_date, str_arg};
pub use registry::{DEFAULT_FETCH_TIMEOUT, ToolRegistry};
pub use result::{Origin, ToolResult, format_timestamp};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A callable data operation
///
/// Implementations only know how to fetch live data. Validation, timeouts,
/// snapshot persistence, and fallback are the registry's job.
#[async_trait]
pub trait DataTool: Send + Sync {
    /// Published metadata
    fn descriptor(&self) -> &ToolDescriptor;

    /// Snapshot key for a call with these (already validated) arguments
    fn cache_key(&self, args: &Value) -> String {
        self.descriptor().cache_key(args)
    }

    /// Checks spanning several arguments, run after schema validation
    fn check_args(&self, _args: &Value) -> Result<()> {
        Ok(())
    }

    /// Fetch live data from the source
    async fn fetch(&self, args: &Value) -> Result<Value>;
}
