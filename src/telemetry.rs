//! Recorded output rows.
//!
//! Facilities write `Datum` rows into named tables through a `Recorder`.
//! Recording is write-only and never fails. `MemoryRecorder` keeps every row
//! for reporting and for the query helpers the tests use.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const REACTOR_STATUS: &str = "ReactorStatus";
pub const REACTOR_EVENTS: &str = "ReactorEvents";
pub const REACTOR_OPERATIONS: &str = "ReactorOperationsLog";
pub const REACTOR_INVENTORIES: &str = "ReactorInventories";
pub const STORAGE_INVENTORIES: &str = "StorageInventories";
pub const TRANSACTIONS: &str = "Transactions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.6}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One row of a recorded table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub table: String,
    #[serde(rename = "AgentId")]
    pub agent_id: usize,
    #[serde(rename = "Time")]
    pub time: u32,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl Datum {
    pub fn new(table: &str, agent_id: usize, time: u32) -> Self {
        Datum {
            table: table.to_string(),
            agent_id,
            time,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Write-only sink for recorded rows
pub trait Recorder {
    fn record(&mut self, datum: Datum);
}

impl Recorder for Vec<Datum> {
    fn record(&mut self, datum: Datum) {
        self.push(datum);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryRecorder {
    rows: Vec<Datum>,
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, datum: Datum) {
        self.rows.push(datum);
    }
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Datum>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn all(&self) -> &[Datum] {
        &self.rows
    }

    pub fn tables(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|d| d.table.as_str()).collect()
    }

    pub fn table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Datum> + 'a {
        self.rows.iter().filter(move |d| d.table == table)
    }

    /// Rows of `table` written by one agent
    pub fn agent_table<'a>(
        &'a self,
        table: &'a str,
        agent_id: usize,
    ) -> impl Iterator<Item = &'a Datum> + 'a {
        self.table(table).filter(move |d| d.agent_id == agent_id)
    }

    /// First row of `table` at `time` written by `agent_id`
    pub fn at<'a>(&'a self, table: &'a str, agent_id: usize, time: u32) -> Option<&'a Datum> {
        self.agent_table(table, agent_id).find(|d| d.time == time)
    }

    /// Rows of `table` whose `key` column holds the text `value`
    pub fn with_text<'a>(
        &'a self,
        table: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = &'a Datum> + 'a {
        self.table(table).filter(move |d| d.text(key) == Some(value))
    }

    /// Per-table row counts
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.table.clone()).or_insert(0) += 1;
        }
        counts
    }
}
