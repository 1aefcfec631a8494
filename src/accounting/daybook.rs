//! Day book tools: vouchers for a day, summaries for a short period

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{LedgerError, Result};
use crate::source::{DataQuery, DataSource, Period, Report, Voucher, decode};
use crate::tools::{DataTool, ParamType, ToolDescriptor, parse_date, str_arg};

/// Longest range accepted by `get_transactions_for_period`, in days
pub const MAX_PERIOD_DAYS: i64 = 7;

/// Vouchers listed individually in a period summary
const PERIOD_SAMPLE: usize = 15;

async fn fetch_vouchers(source: &dyn DataSource, period: Period) -> Result<Vec<Voucher>> {
    let raw = source.query(&DataQuery::report_for(Report::DayBook, period)).await?;
    decode("day book", raw)
}

/// `get_transactions_for_date`
pub struct DayTransactionsTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
}

impl DayTransactionsTool {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new("get_transactions_for_date", "Get all transactions for a single date.")
                .with_param("date", ParamType::Date, "The day to list"),
            source,
        }
    }
}

#[async_trait]
impl DataTool for DayTransactionsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, args: &Value) -> Result<Value> {
        let raw_date = str_arg(args, "date");
        let date = parse_date(raw_date)?;
        let vouchers = fetch_vouchers(self.source.as_ref(), Period::day(date)).await?;

        Ok(json!({"date": raw_date, "count": vouchers.len(), "vouchers": vouchers}))
    }
}

/// `get_transactions_for_period`
pub struct PeriodTransactionsTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
}

impl PeriodTransactionsTool {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "get_transactions_for_period",
                "Get transactions summary for a date range. Max 7 days.",
            )
            .with_param("from_date", ParamType::Date, "First day of the range")
            .with_param("to_date", ParamType::Date, "Last day of the range"),
            source,
        }
    }

    fn period(args: &Value) -> Result<Period> {
        let period = Period::new(parse_date(str_arg(args, "from_date"))?, parse_date(str_arg(args, "to_date"))?);
        if period.to < period.from {
            return Err(LedgerError::Validation(
                "get_transactions_for_period: from_date must not be after to_date".to_string(),
            ));
        }
        if period.days() > MAX_PERIOD_DAYS {
            return Err(LedgerError::Validation(format!(
                "get_transactions_for_period: range covers {} days, maximum is {}",
                period.days(),
                MAX_PERIOD_DAYS
            )));
        }
        Ok(period)
    }
}

#[async_trait]
impl DataTool for PeriodTransactionsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check_args(&self, args: &Value) -> Result<()> {
        Self::period(args).map(|_| ())
    }

    async fn fetch(&self, args: &Value) -> Result<Value> {
        let period = Self::period(args)?;
        let vouchers = fetch_vouchers(self.source.as_ref(), period).await?;

        let mut totals: HashMap<&str, (usize, f64)> = HashMap::new();
        for v in &vouchers {
            let entry = totals.entry(v.voucher_type.as_str()).or_default();
            entry.0 += 1;
            entry.1 += v.amount;
        }
        let mut by_type: Vec<(&str, (usize, f64))> = totals.into_iter().collect();
        by_type.sort_by(|a, b| b.1.0.cmp(&a.1.0).then_with(|| a.0.cmp(b.0)));
        let by_type: Vec<Value> = by_type
            .into_iter()
            .map(|(ty, (count, amount))| json!({"type": ty, "count": count, "amount": amount}))
            .collect();

        let first: Vec<&Voucher> = vouchers.iter().take(PERIOD_SAMPLE).collect();

        Ok(json!({
            "from_date": str_arg(args, "from_date"),
            "to_date": str_arg(args, "to_date"),
            "total_vouchers": vouchers.len(),
            "by_type": by_type,
            "first": first,
            "more": vouchers.len().saturating_sub(PERIOD_SAMPLE)
        }))
    }
}
