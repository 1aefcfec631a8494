//! Data source abstraction
//!
//! The accounting system is reached through an opaque request/response
//! service. A `DataQuery` names what to export; the answer is JSON that the
//! accounting tools decode into the typed records below.

mod http;

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, Result};

pub use http::HttpDataSource;

/// Master collections exported by the accounting system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Ledger,
    Group,
    StockItem,
}

/// Standard reports exported by the accounting system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    TrialBalance,
    ProfitAndLoss,
    BalanceSheet,
    DayBook,
}

impl Report {
    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            Self::TrialBalance => "Trial Balance",
            Self::ProfitAndLoss => "Profit and Loss",
            Self::BalanceSheet => "Balance Sheet",
            Self::DayBook => "Day Book",
        }
    }
}

/// Inclusive date range, serialized as YYYYMMDD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(with = "yyyymmdd")]
    pub from: NaiveDate,
    #[serde(with = "yyyymmdd")]
    pub to: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// A single day
    pub fn day(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    /// Number of days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

/// One abstract query against the data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQuery {
    Collection {
        collection: Collection,
    },
    Report {
        report: Report,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
    },
    /// Cheap reachability probe
    Ping,
}

impl DataQuery {
    pub fn collection(collection: Collection) -> Self {
        Self::Collection { collection }
    }

    pub fn report(report: Report) -> Self {
        Self::Report { report, period: None }
    }

    pub fn report_for(report: Report, period: Period) -> Self {
        Self::Report {
            report,
            period: Some(period),
        }
    }
}

impl fmt::Display for DataQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection { collection } => write!(f, "collection:{:?}", collection),
            Self::Report { report, period: None } => write!(f, "report:{}", report.title()),
            Self::Report {
                report,
                period: Some(p),
            } => write!(
                f,
                "report:{} {}..{}",
                report.title(),
                p.from.format("%Y%m%d"),
                p.to.format("%Y%m%d")
            ),
            Self::Ping => write!(f, "ping"),
        }
    }
}

/// The accounting data service
///
/// One query yields one JSON response, or an `UpstreamTimeout` /
/// `UpstreamUnavailable` error.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn query(&self, query: &DataQuery) -> Result<Value>;
}

/// A ledger account with its closing balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub balance: f64,
}

/// One line of a display report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// A day book voucher. `amount` is already absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    #[serde(rename = "type")]
    pub voucher_type: String,
    pub date: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub number: String,
}

/// Decode a source response, treating shape mismatches as a malformed upstream
pub fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| LedgerError::UpstreamUnavailable(format!("malformed {} response: {}", what, e)))
}

mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y%m%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_query_serialization() {
        let q = DataQuery::collection(Collection::StockItem);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"kind": "collection", "collection": "stock_item"})
        );

        let q = DataQuery::report_for(Report::DayBook, Period::new(date(2025, 7, 1), date(2025, 7, 5)));
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"kind": "report", "report": "day_book", "period": {"from": "20250701", "to": "20250705"}})
        );

        assert_eq!(serde_json::to_value(DataQuery::Ping).unwrap(), json!({"kind": "ping"}));
    }

    #[test]
    fn test_query_deserialization() {
        let q: DataQuery = serde_json::from_value(json!({"kind": "report", "report": "trial_balance"})).unwrap();
        assert_eq!(q, DataQuery::report(Report::TrialBalance));
    }

    #[test]
    fn test_query_display() {
        assert_eq!(DataQuery::collection(Collection::Ledger).to_string(), "collection:Ledger");
        assert_eq!(DataQuery::report(Report::BalanceSheet).to_string(), "report:Balance Sheet");
        assert_eq!(
            DataQuery::report_for(Report::DayBook, Period::day(date(2025, 7, 1))).to_string(),
            "report:Day Book 20250701..20250701"
        );
    }

    #[test]
    fn test_period_days() {
        assert_eq!(Period::day(date(2025, 7, 1)).days(), 1);
        assert_eq!(Period::new(date(2025, 7, 1), date(2025, 7, 7)).days(), 7);
    }

    #[test]
    fn test_decode_ledgers_with_defaults() {
        let ledgers: Vec<Ledger> = decode("ledger", json!([{"name": "Cash"}])).unwrap();
        assert_eq!(ledgers[0].group, "");
        assert_eq!(ledgers[0].balance, 0.0);
    }

    #[test]
    fn test_decode_voucher_type_field() {
        let v: Voucher = decode(
            "voucher",
            json!({"type": "Sales", "date": "20250701", "party": "Debtor_2", "amount": 200.0}),
        )
        .unwrap();
        assert_eq!(v.voucher_type, "Sales");
        assert_eq!(v.narration, "");
    }

    #[test]
    fn test_decode_malformed_is_upstream() {
        let err = decode::<Vec<Ledger>>("ledger", json!({"oops": true})).unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("malformed ledger response"));
    }
}
