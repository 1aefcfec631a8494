//! Master data tools: ledgers, groups, stock items, party balances, search

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::{LedgerError, Result};
use crate::source::{Collection, DataQuery, DataSource, Ledger, decode};
use crate::tools::{DataTool, ParamType, ToolDescriptor, str_arg};

async fn fetch_ledgers(source: &dyn DataSource) -> Result<Vec<Ledger>> {
    let raw = source.query(&DataQuery::collection(Collection::Ledger)).await?;
    decode("ledger", raw)
}

/// `get_all_ledgers`
pub struct LedgerListTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
}

impl LedgerListTool {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "get_all_ledgers",
                "Get all ledger accounts with their group and closing balance.",
            ),
            source,
        }
    }
}

#[async_trait]
impl DataTool for LedgerListTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _args: &Value) -> Result<Value> {
        let ledgers = fetch_ledgers(self.source.as_ref()).await?;
        Ok(json!({"count": ledgers.len(), "ledgers": ledgers}))
    }
}

/// A collection exported as a plain list of names
pub struct NameListTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
    collection: Collection,
    field: &'static str,
}

impl NameListTool {
    /// `get_account_groups`
    pub fn groups(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new("get_account_groups", "Get all account groups."),
            source,
            collection: Collection::Group,
            field: "groups",
        }
    }

    /// `get_stock_items`
    pub fn stock_items(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new("get_stock_items", "Get all inventory/stock items."),
            source,
            collection: Collection::StockItem,
            field: "stock_items",
        }
    }
}

#[async_trait]
impl DataTool for NameListTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _args: &Value) -> Result<Value> {
        let raw = self.source.query(&DataQuery::collection(self.collection)).await?;
        let names: Vec<String> = decode(self.field, raw)?;

        let mut payload = Map::new();
        payload.insert("count".to_string(), json!(names.len()));
        payload.insert(self.field.to_string(), json!(names));
        Ok(Value::Object(payload))
    }
}

/// Outstanding balances for every ledger in one group, largest first
pub struct PartyBalancesTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
    group: &'static str,
}

impl PartyBalancesTool {
    /// `get_sundry_debtors`
    pub fn debtors(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "get_sundry_debtors",
                "Get customers who owe us money (Sundry Debtors), sorted by amount.",
            )
            .with_optional_param("limit", ParamType::Integer, "Only the N largest balances"),
            source,
            group: "Sundry Debtors",
        }
    }

    /// `get_sundry_creditors`
    pub fn creditors(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "get_sundry_creditors",
                "Get suppliers we owe money to (Sundry Creditors), sorted by amount.",
            )
            .with_optional_param("limit", ParamType::Integer, "Only the N largest balances"),
            source,
            group: "Sundry Creditors",
        }
    }
}

#[async_trait]
impl DataTool for PartyBalancesTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn check_args(&self, args: &Value) -> Result<()> {
        match args.get("limit").and_then(Value::as_i64) {
            Some(n) if n < 1 => Err(LedgerError::Validation(format!("limit must be at least 1, got {}", n))),
            _ => Ok(()),
        }
    }

    async fn fetch(&self, args: &Value) -> Result<Value> {
        let mut parties: Vec<Ledger> = fetch_ledgers(self.source.as_ref())
            .await?
            .into_iter()
            .filter(|l| l.group == self.group)
            .collect();
        parties.sort_by(|a, b| b.balance.abs().total_cmp(&a.balance.abs()));

        // count and total always cover the whole group
        let count = parties.len();
        let total: f64 = parties.iter().map(|p| p.balance.abs()).sum();
        let limit = args.get("limit").and_then(Value::as_u64).map_or(count, |n| n as usize);
        let rows: Vec<Value> = parties
            .iter()
            .take(limit)
            .map(|p| json!({"name": p.name, "amount": p.balance.abs()}))
            .collect();

        Ok(json!({
            "group": self.group,
            "count": count,
            "parties": rows,
            "total": total
        }))
    }
}

/// `search_ledger`
pub struct SearchLedgerTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
}

impl SearchLedgerTool {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "search_ledger",
                "Search for a ledger by partial name (case-insensitive).",
            )
            .with_param("partial_name", ParamType::String, "Part of the ledger name"),
            source,
        }
    }
}

#[async_trait]
impl DataTool for SearchLedgerTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    // Searches differing only in case share a snapshot
    fn cache_key(&self, args: &Value) -> String {
        format!(
            "{}[partial_name={}]",
            self.descriptor.name,
            str_arg(args, "partial_name").to_lowercase()
        )
    }

    async fn fetch(&self, args: &Value) -> Result<Value> {
        let partial = str_arg(args, "partial_name");
        let needle = partial.to_lowercase();
        let ledgers = fetch_ledgers(self.source.as_ref()).await?;

        let matches: Vec<&Ledger> = ledgers
            .iter()
            .filter(|l| l.name.to_lowercase().contains(&needle))
            .collect();

        if matches.is_empty() {
            let available: Vec<&str> = ledgers.iter().map(|l| l.name.as_str()).collect();
            return Ok(json!({"query": partial, "matches": [], "available": available}));
        }
        Ok(json!({"query": partial, "matches": matches}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::FakeSource;

    fn ledgers() -> Value {
        json!([
            {"name": "Cash", "group": "Cash-in-Hand", "balance": 500.0},
            {"name": "Debtor_1", "group": "Sundry Debtors", "balance": 100.0},
            {"name": "Debtor_2", "group": "Sundry Debtors", "balance": -200.0},
            {"name": "Supplier_A", "group": "Sundry Creditors", "balance": 75.5}
        ])
    }

    fn source() -> Arc<FakeSource> {
        Arc::new(FakeSource::new().with(DataQuery::collection(Collection::Ledger), ledgers()))
    }

    #[tokio::test]
    async fn test_all_ledgers() {
        let tool = LedgerListTool::new(source());
        let payload = tool.fetch(&json!({})).await.unwrap();
        assert_eq!(payload["count"], 4);
        assert_eq!(payload["ledgers"][0]["name"], "Cash");
    }

    #[tokio::test]
    async fn test_debtors_sorted_by_absolute_balance() {
        let tool = PartyBalancesTool::debtors(source());
        let payload = tool.fetch(&json!({})).await.unwrap();

        assert_eq!(payload["group"], "Sundry Debtors");
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["parties"][0]["name"], "Debtor_2");
        assert_eq!(payload["parties"][0]["amount"], 200.0);
        assert_eq!(payload["parties"][1]["name"], "Debtor_1");
        assert_eq!(payload["total"], 300.0);
    }

    #[tokio::test]
    async fn test_debtors_limit_keeps_group_totals() {
        let tool = PartyBalancesTool::debtors(source());
        let payload = tool.fetch(&json!({"limit": 1})).await.unwrap();

        assert_eq!(payload["count"], 2);
        assert_eq!(payload["parties"].as_array().unwrap().len(), 1);
        assert_eq!(payload["parties"][0]["name"], "Debtor_2");
        assert_eq!(payload["total"], 300.0);

        assert_eq!(tool.cache_key(&json!({"limit": 1})), "get_sundry_debtors[limit=1]");
        assert_eq!(tool.cache_key(&json!({})), "get_sundry_debtors");
    }

    #[test]
    fn test_debtors_limit_must_be_positive() {
        let tool = PartyBalancesTool::debtors(source());
        assert!(tool.descriptor().validate(&json!({"limit": "three"})).is_err());
        assert!(tool.check_args(&json!({"limit": 0})).is_err());
        assert!(tool.check_args(&json!({"limit": 5})).is_ok());
        assert!(tool.check_args(&json!({})).is_ok());
    }

    #[tokio::test]
    async fn test_creditors() {
        let tool = PartyBalancesTool::creditors(source());
        let payload = tool.fetch(&json!({})).await.unwrap();
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["total"], 75.5);
    }

    #[tokio::test]
    async fn test_names_list() {
        let groups = json!(["Bank Accounts", "Capital Account"]);
        let source = Arc::new(FakeSource::new().with(DataQuery::collection(Collection::Group), groups));
        let payload = NameListTool::groups(source).fetch(&json!({})).await.unwrap();
        assert_eq!(payload["groups"], json!(["Bank Accounts", "Capital Account"]));
        assert_eq!(payload["count"], 2);
    }

    #[tokio::test]
    async fn test_search_case_insensitive() {
        let tool = SearchLedgerTool::new(source());
        let payload = tool.fetch(&json!({"partial_name": "DEBTOR"})).await.unwrap();
        assert_eq!(payload["matches"].as_array().unwrap().len(), 2);
        assert!(payload.get("available").is_none());
    }

    #[tokio::test]
    async fn test_search_no_match_lists_available() {
        let tool = SearchLedgerTool::new(source());
        let payload = tool.fetch(&json!({"partial_name": "bank"})).await.unwrap();
        assert_eq!(payload["matches"], json!([]));
        assert_eq!(payload["available"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_search_cache_key_case_folded() {
        let tool = SearchLedgerTool::new(source());
        assert_eq!(
            tool.cache_key(&json!({"partial_name": "Cash"})),
            tool.cache_key(&json!({"partial_name": "cASH"}))
        );
        assert_eq!(tool.cache_key(&json!({"partial_name": "Cash"})), "search_ledger[partial_name=cash]");
    }

    #[tokio::test]
    async fn test_malformed_ledgers_is_upstream_error() {
        let source = Arc::new(FakeSource::new().with(DataQuery::collection(Collection::Ledger), json!("garbage")));
        let err = LedgerListTool::new(source).fetch(&json!({})).await.unwrap_err();
        assert!(err.is_upstream());
    }
}
