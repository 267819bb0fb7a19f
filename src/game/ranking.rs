//! Top-5 score table and best-time record, persisted through a [`RankingStore`].
//!
//! Failures never propagate out of this module: a bad stored record is
//! replaced by an empty one in memory (the stored value is left alone), and a
//! rejected or failed save reports `false` without touching the current table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::ranking::{MAX_ENTRIES, NAME_LEN, STORAGE_KEY};
use crate::storage::RankingStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub name: String,
    pub score: u32,
    pub integrity_percent: f32,
    pub elapsed_time: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRecord {
    pub top_scores: Vec<RankingEntry>,
    /// Best elapsed time ever saved; `null` until the first save
    pub record_time: Option<f32>,
    pub record_holder: String,
}

impl RankingRecord {
    fn validate(&self) -> Result<(), String> {
        if self.top_scores.len() > MAX_ENTRIES {
            return Err(format!("{} entries (max {})", self.top_scores.len(), MAX_ENTRIES));
        }
        if let Some(entry) = self.top_scores.iter().find(|e| !is_valid_name(&e.name)) {
            return Err(format!("invalid name {:?}", entry.name));
        }
        if !self.record_holder.is_empty() && !is_valid_name(&self.record_holder) {
            return Err(format!("invalid record holder {:?}", self.record_holder));
        }
        Ok(())
    }
}

/// Exactly three ASCII uppercase letters.
pub fn is_valid_name(name: &str) -> bool {
    name.len() == NAME_LEN && name.bytes().all(|b| b.is_ascii_uppercase())
}

pub struct RankingSystem<S: RankingStore> {
    store: S,
    record: RankingRecord,
}

impl<S: RankingStore> RankingSystem<S> {
    /// Load the stored ranking, falling back to an empty one.
    pub fn new(store: S) -> Self {
        let record = load_record(&store);
        Self { store, record }
    }

    /// Insert a score and persist. Returns false for an invalid name,
    /// non-finite numbers or a failed write; the table is unchanged then.
    pub fn save_score(&mut self, name: &str, score: u32, integrity_percent: f32, elapsed_time: f32) -> bool {
        if !is_valid_name(name) {
            log::warn!("[Ranking] Rejected name {:?}", name);
            return false;
        }
        if !integrity_percent.is_finite() || !elapsed_time.is_finite() {
            log::warn!("[Ranking] Rejected non-finite result for {}", name);
            return false;
        }

        let mut updated = self.record.clone();
        updated.top_scores.push(RankingEntry {
            name: name.to_string(),
            score,
            integrity_percent,
            elapsed_time,
            timestamp: Utc::now(),
        });
        // Stable: an equal score never displaces an older entry.
        updated.top_scores.sort_by(|a, b| b.score.cmp(&a.score));
        updated.top_scores.truncate(MAX_ENTRIES);

        if updated.record_time.map_or(true, |best| elapsed_time < best) {
            updated.record_time = Some(elapsed_time);
            updated.record_holder = name.to_string();
        }

        let json = match serde_json::to_string(&updated) {
            Ok(json) => json,
            Err(e) => {
                log::error!("[Ranking] Failed to serialize ranking: {}", e);
                return false;
            }
        };
        if let Err(e) = self.store.save(STORAGE_KEY, &json) {
            log::error!("[Ranking] {}", e);
            return false;
        }

        self.record = updated;
        log::info!("[Ranking] Saved {} with {} points", name, score);
        true
    }

    /// True while the table has free slots, else only for scores beating 5th place.
    pub fn is_top_score(&self, score: u32) -> bool {
        match self.record.top_scores.get(MAX_ENTRIES - 1) {
            Some(last) if self.record.top_scores.len() >= MAX_ENTRIES => score > last.score,
            _ => true,
        }
    }

    pub fn top_scores(&self) -> &[RankingEntry] {
        &self.record.top_scores
    }

    pub fn record_time(&self) -> Option<f32> {
        self.record.record_time
    }

    pub fn record_holder(&self) -> &str {
        &self.record.record_holder
    }

    /// Minimum score that would enter a full table; 0 while it has free slots.
    pub fn score_needed_for_top5(&self) -> u32 {
        if self.record.top_scores.len() < MAX_ENTRIES {
            return 0;
        }
        self.record.top_scores[MAX_ENTRIES - 1].score.saturating_add(1)
    }

    pub fn record(&self) -> &RankingRecord {
        &self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn load_record<S: RankingStore>(store: &S) -> RankingRecord {
    let raw = match store.load(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return RankingRecord::default(),
        Err(e) => {
            log::warn!("[Ranking] {}; starting with an empty ranking", e);
            return RankingRecord::default();
        }
    };

    let mut record: RankingRecord = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("[Ranking] Malformed stored ranking ({}); starting with an empty ranking", e);
            return RankingRecord::default();
        }
    };
    if let Err(reason) = record.validate() {
        log::warn!("[Ranking] Rejected stored ranking: {}", reason);
        return RankingRecord::default();
    }
    record.top_scores.sort_by(|a, b| b.score.cmp(&a.score));
    record
}
