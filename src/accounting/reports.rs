//! Financial statement tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::source::{DataQuery, DataSource, Report, ReportRow, decode};
use crate::tools::{DataTool, ToolDescriptor};

/// A display report exported as name/amount rows
pub struct ReportTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
    report: Report,
}

impl ReportTool {
    fn new(name: &str, description: &str, report: Report, source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(name, description),
            source,
            report,
        }
    }

    /// `get_trial_balance`
    pub fn trial_balance(source: Arc<dyn DataSource>) -> Self {
        Self::new(
            "get_trial_balance",
            "Get trial balance with debit/credit for all account groups.",
            Report::TrialBalance,
            source,
        )
    }

    /// `get_profit_and_loss`
    pub fn profit_and_loss(source: Arc<dyn DataSource>) -> Self {
        Self::new(
            "get_profit_and_loss",
            "Get P&L: sales, costs, expenses, net profit.",
            Report::ProfitAndLoss,
            source,
        )
    }

    /// `get_balance_sheet`
    pub fn balance_sheet(source: Arc<dyn DataSource>) -> Self {
        Self::new(
            "get_balance_sheet",
            "Get Balance Sheet: capital, loans, liabilities, assets.",
            Report::BalanceSheet,
            source,
        )
    }
}

#[async_trait]
impl DataTool for ReportTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _args: &Value) -> Result<Value> {
        let raw = self.source.query(&DataQuery::report(self.report)).await?;
        let rows: Vec<ReportRow> = decode(self.report.title(), raw)?;

        let mut payload = json!({"report": self.report.title(), "rows": rows});
        if self.report == Report::TrialBalance {
            payload["total_debit"] = json!(rows.iter().filter_map(|r| r.debit).sum::<f64>());
            payload["total_credit"] = json!(rows.iter().filter_map(|r| r.credit).sum::<f64>());
        }
        Ok(payload)
    }
}
