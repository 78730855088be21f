//! In-memory session history of completed trades

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::shared::types::TokenAmounts;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub total_profit: i128,
    pub balance_change: i128,
    pub signatures: Vec<String>,
    pub token_amounts: TokenAmounts,
}

/// Bounded, most-recent-first
#[derive(Debug, Clone)]
pub struct TradeHistory {
    records: VecDeque<TradeRecord>,
    capacity: usize,
}

impl Default for TradeHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl TradeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: TradeRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&TradeRecord> {
        self.records.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_vec(&self) -> Vec<TradeRecord> {
        self.records.iter().cloned().collect()
    }
}
