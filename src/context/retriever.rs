//! Business context retrieval
//!
//! `KeywordRetriever` ranks configured business rules by how many query terms
//! they share with the question. Terms of four or more letters also match on
//! prefix, so "margin" finds "margins".

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "what", "who", "how", "our", "with", "this", "that", "from", "have", "has",
    "you", "your", "does", "which", "any", "all", "can", "its",
];

/// A piece of business knowledge the accounts do not contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: String,
    pub text: String,
}

impl BusinessRule {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Rules used when the configuration supplies none
pub fn default_rules() -> Vec<BusinessRule> {
    vec![
        BusinessRule::new(
            "credit_policy",
            "Standard credit period for customers is 30 days. Outstanding beyond 45 days is overdue. \
             Beyond 90 days is bad debt risk and needs immediate follow-up.",
        ),
        BusinessRule::new(
            "margin_targets",
            "Target gross margin is 12-15 percent. If gross margin drops below 10 percent, it needs attention. \
             Net profit margin target is 8 percent.",
        ),
        BusinessRule::new(
            "concentration_risk",
            "No single customer should exceed 25 percent of total sales. Top 3 customers should not exceed \
             50 percent combined. This is called concentration risk.",
        ),
        BusinessRule::new(
            "ledger_conventions",
            "A negative balance for Sundry Debtors means the customer owes us money (debit balance). \
             A negative balance for Sundry Creditors means we owe the supplier money. \
             The financial year runs April to March.",
        ),
        BusinessRule::new(
            "payment_terms",
            "Supplier payments should be made within their credit period to maintain good relationships \
             and avail early payment discounts. Always verify outstanding amounts before making payments.",
        ),
    ]
}

/// A ranked piece of retrieved context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub source: String,
    pub text: String,
    pub score: f64,
}

/// Free-text query to ranked snippets. Best-effort.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Snippet>>;
}

/// Lexical retriever over a fixed rule set
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    rules: Vec<(BusinessRule, BTreeSet<String>)>,
}

impl KeywordRetriever {
    pub fn new(rules: Vec<BusinessRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let terms = terms(&rule.text);
                (rule, terms)
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn rank(&self, query: &str) -> Vec<Snippet> {
        let wanted = terms(query);
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<Snippet> = self
            .rules
            .iter()
            .filter_map(|(rule, rule_terms)| {
                let hits = wanted
                    .iter()
                    .filter(|w| rule_terms.iter().any(|t| terms_match(w, t)))
                    .count();
                (hits > 0).then(|| Snippet {
                    source: rule.id.clone(),
                    text: rule.text.clone(),
                    score: hits as f64 / wanted.len() as f64,
                })
            })
            .collect();

        // Stable sort keeps configured order among equal scores
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

impl Default for KeywordRetriever {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Snippet>> {
        let mut ranked = self.rank(query);
        ranked.truncate(limit);
        Ok(ranked)
    }
}

/// Retriever that never returns anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRetriever;

#[async_trait]
impl Retriever for NoopRetriever {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Result<Vec<Snippet>> {
        Ok(Vec::new())
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn terms_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= 4 && long.starts_with(short)
}
