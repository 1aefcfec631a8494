//! Accounting tool set
//!
//! The standard data tools exposed to the model. Each one turns a call into a
//! `DataQuery`, decodes the answer, and shapes it into a compact payload.

mod daybook;
mod masters;
mod reports;
mod status;

use std::sync::Arc;

use crate::error::Result;
use crate::snapshot::SnapshotStore;
use crate::source::DataSource;
use crate::tools::{DataTool, ToolRegistry};

pub use daybook::{DayTransactionsTool, MAX_PERIOD_DAYS, PeriodTransactionsTool};
pub use masters::{LedgerListTool, NameListTool, PartyBalancesTool, SearchLedgerTool};
pub use reports::ReportTool;
pub use status::SourceStatusTool;

/// Every standard tool over one data source
pub fn standard_tools(source: Arc<dyn DataSource>, store: Arc<dyn SnapshotStore>) -> Vec<Arc<dyn DataTool>> {
    vec![
        Arc::new(LedgerListTool::new(source.clone())),
        Arc::new(NameListTool::groups(source.clone())),
        Arc::new(NameListTool::stock_items(source.clone())),
        Arc::new(ReportTool::trial_balance(source.clone())),
        Arc::new(ReportTool::profit_and_loss(source.clone())),
        Arc::new(ReportTool::balance_sheet(source.clone())),
        Arc::new(PartyBalancesTool::debtors(source.clone())),
        Arc::new(PartyBalancesTool::creditors(source.clone())),
        Arc::new(SearchLedgerTool::new(source.clone())),
        Arc::new(DayTransactionsTool::new(source.clone())),
        Arc::new(PeriodTransactionsTool::new(source.clone())),
        Arc::new(SourceStatusTool::new(source, store)),
    ]
}

/// Register the standard tools, sharing the registry's snapshot store
pub fn register_standard_tools(registry: &ToolRegistry, source: Arc<dyn DataSource>) -> Result<()> {
    for tool in standard_tools(source, registry.store()) {
        registry.register(tool)?;
    }
    Ok(())
}
