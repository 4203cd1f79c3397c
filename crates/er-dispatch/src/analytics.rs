//! Append-only dispatch analytics.
//!
//! Sinks are called after a response is built and never influence it; a
//! failing sink is logged and ignored by the orchestrator.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use er_core::{Condition, HospitalId, Priority};

use crate::recommendation::{DispatchResponse, DispatchStatus};
use crate::{DispatchError, DispatchResult};

/// One dispatched call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchLogEntry {
    pub timestamp: DateTime<Utc>,
    pub call_id: Option<String>,
    pub condition: Condition,
    pub priority: Priority,
    pub status: DispatchStatus,
    pub hospital_id: Option<HospitalId>,
    pub estimated_time_min: Option<f64>,
    pub degradations: usize,
    pub processing_ms: f64,
}

impl DispatchLogEntry {
    pub fn from_response(response: &DispatchResponse, processing_ms: f64) -> Self {
        let patient = response.patient();
        Self {
            timestamp: Utc::now(),
            call_id: response.call_id().map(str::to_string),
            condition: patient.condition,
            priority: patient.priority,
            status: response.status(),
            hospital_id: response.hospital_id(),
            estimated_time_min: response.estimated_time_min(),
            degradations: response.degradations().len(),
            processing_ms,
        }
    }
}

/// Receives every completed dispatch.
pub trait DispatchSink: Send + Sync {
    fn record(&self, entry: &DispatchLogEntry) -> DispatchResult<()>;
}

// ── In-memory log ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DispatchLog {
    entries: Mutex<Vec<DispatchLogEntry>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub window_hours: i64,
    pub total_dispatches: usize,
    /// Mean estimated travel time over optimized responses.
    pub avg_travel_time_min: Option<f64>,
    pub avg_processing_ms: f64,
    pub fallback_rate: f64,
    pub condition_breakdown: BTreeMap<String, usize>,
    pub priority_breakdown: BTreeMap<String, usize>,
}

impl DispatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<DispatchLogEntry> {
        self.lock().clone()
    }

    /// Report over the last `window`.  `None` when nothing was dispatched in
    /// that period.
    pub fn performance_report(&self, window: Duration) -> Option<PerformanceReport> {
        self.performance_report_at(Utc::now(), window)
    }

    pub fn performance_report_at(&self, now: DateTime<Utc>, window: Duration) -> Option<PerformanceReport> {
        let cutoff = now - window;
        let entries = self.lock();
        let recent: Vec<&DispatchLogEntry> = entries.iter().filter(|e| e.timestamp > cutoff).collect();
        if recent.is_empty() {
            return None;
        }

        let optimized: Vec<f64> = recent
            .iter()
            .filter(|e| e.status == DispatchStatus::Optimized)
            .filter_map(|e| e.estimated_time_min)
            .collect();
        let mut condition_breakdown = BTreeMap::new();
        let mut priority_breakdown = BTreeMap::new();
        for e in &recent {
            *condition_breakdown.entry(e.condition.to_string()).or_insert(0) += 1;
            *priority_breakdown.entry(e.priority.to_string()).or_insert(0) += 1;
        }
        let n = recent.len() as f64;
        let fallbacks = recent.iter().filter(|e| e.status == DispatchStatus::Fallback).count();

        Some(PerformanceReport {
            window_hours: window.num_hours(),
            total_dispatches: recent.len(),
            avg_travel_time_min: (!optimized.is_empty())
                .then(|| optimized.iter().sum::<f64>() / optimized.len() as f64),
            avg_processing_ms: recent.iter().map(|e| e.processing_ms).sum::<f64>() / n,
            fallback_rate: fallbacks as f64 / n,
            condition_breakdown,
            priority_breakdown,
        })
    }

    // Entries are only ever appended, so a poisoned lock still holds a
    // usable log.
    fn lock(&self) -> MutexGuard<'_, Vec<DispatchLogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DispatchSink for DispatchLog {
    fn record(&self, entry: &DispatchLogEntry) -> DispatchResult<()> {
        self.lock().push(entry.clone());
        Ok(())
    }
}

// ── CSV log ───────────────────────────────────────────────────────────────────

/// Appends one CSV row per dispatch.  The header is written only when the
/// file starts out empty.
pub struct CsvDispatchLog {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvDispatchLog {
    pub fn open(path: &Path) -> DispatchResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new().has_headers(fresh).from_writer(file);
        Ok(Self { writer: Mutex::new(writer) })
    }
}

impl DispatchSink for CsvDispatchLog {
    fn record(&self, entry: &DispatchLogEntry) -> DispatchResult<()> {
        let mut w = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        w.serialize(entry).map_err(|e| DispatchError::Log(e.to_string()))?;
        w.flush()?;
        Ok(())
    }
}
