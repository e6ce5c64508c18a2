// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Alert dispatch boundary.
//!
//! Delivery (email, SMS, dashboard push) is a collaborator's concern; the
//! engine only hands finished [`DecisionRecord`]s across this trait. The
//! crate ships a buffering [`VecSink`] for tests and demos.

use crate::decision::DecisionRecord;

/// Receives decision records as they are produced.
pub trait AlertSink {
    fn dispatch(&mut self, record: &DecisionRecord);
}

/// In-memory sink collecting every dispatched record.
#[derive(Debug, Default)]
pub struct VecSink {
    records: Vec<DecisionRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records that triggered irrigation.
    pub fn triggered_count(&self) -> usize {
        self.records.iter().filter(|r| r.triggered).count()
    }
}

impl AlertSink for VecSink {
    fn dispatch(&mut self, record: &DecisionRecord) {
        self.records.push(record.clone());
    }
}
