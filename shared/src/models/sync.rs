//! Sync configuration and run log models

use serde::{Deserialize, Serialize};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// How often a client's inventory is reconciled automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFrequency {
    FiveMinutes,
    Hourly,
    Daily,
    Weekly,
}

impl SyncFrequency {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "five_minutes" => Some(Self::FiveMinutes),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::FiveMinutes => "five_minutes",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    /// Fixed offset between two runs (millis)
    pub fn interval_millis(&self) -> i64 {
        match self {
            Self::FiveMinutes => 5 * MINUTE_MS,
            Self::Hourly => HOUR_MS,
            Self::Daily => DAY_MS,
            Self::Weekly => 7 * DAY_MS,
        }
    }
}

/// Per-client automatic sync settings
///
/// Timestamps and status are written by the scheduler only; frequency and
/// flags belong to the configuration UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub client_id: i64,
    pub auto_sync_enabled: bool,
    pub frequency: SyncFrequency,
    pub last_sync_at: Option<i64>,
    /// `None` means never scheduled (due immediately when enabled)
    pub next_sync_at: Option<i64>,
    pub last_sync_status: Option<SyncRunStatus>,
    /// Push corrections when discrepancies are found (authoritative mode)
    pub auto_correct: bool,
}

impl SyncConfig {
    /// A config is due when auto-sync is on and its next run time has passed
    pub fn is_due(&self, now: i64) -> bool {
        self.auto_sync_enabled && self.next_sync_at.is_none_or(|next| next <= now)
    }
}

/// What triggered a run and whether it may mutate the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunKind {
    ScheduledDryRun,
    ScheduledAuthoritative,
    ManualDryRun,
    ManualAuthoritative,
}

impl SyncRunKind {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "scheduled_dry_run" => Some(Self::ScheduledDryRun),
            "scheduled_authoritative" => Some(Self::ScheduledAuthoritative),
            "manual_dry_run" => Some(Self::ManualDryRun),
            "manual_authoritative" => Some(Self::ManualAuthoritative),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::ScheduledDryRun => "scheduled_dry_run",
            Self::ScheduledAuthoritative => "scheduled_authoritative",
            Self::ManualDryRun => "manual_dry_run",
            Self::ManualAuthoritative => "manual_authoritative",
        }
    }
}

/// Lifecycle status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    InProgress,
    Success,
    Failed,
    Partial,
}

impl SyncRunStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

/// One reconciliation run (opened in-progress, closed exactly once)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub client_id: i64,
    pub run_kind: SyncRunKind,
    pub status: SyncRunStatus,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub total_skus: i64,
    pub discrepancies: i64,
    pub conflicts: i64,
    pub corrected: i64,
    pub failed: i64,
    pub duration_ms: Option<i64>,
    /// Structured error payload (first errors, abort reason)
    pub error: Option<serde_json::Value>,
}

/// Totals written when a run is closed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncLogClose {
    pub total_skus: i64,
    pub discrepancies: i64,
    pub conflicts: i64,
    pub corrected: i64,
    pub failed: i64,
    pub duration_ms: i64,
    pub error: Option<serde_json::Value>,
}

/// External store credentials and canonical location mapping of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStore {
    pub client_id: i64,
    /// e.g. `acme.myshopify.com`
    pub shop_domain: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Canonical local stock location used to scope ledger sums
    pub location_id: Option<i64>,
    /// Platform location GID mapped to `location_id`
    pub external_location_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, next: Option<i64>) -> SyncConfig {
        SyncConfig {
            client_id: 1,
            auto_sync_enabled: enabled,
            frequency: SyncFrequency::Hourly,
            last_sync_at: None,
            next_sync_at: next,
            last_sync_status: None,
            auto_correct: false,
        }
    }

    #[test]
    fn due_when_enabled_and_past() {
        assert!(config(true, Some(1_000)).is_due(1_000));
        assert!(config(true, Some(999)).is_due(1_000));
        assert!(!config(true, Some(1_001)).is_due(1_000));
    }

    #[test]
    fn never_due_when_disabled() {
        assert!(!config(false, Some(0)).is_due(1_000));
        assert!(!config(false, None).is_due(1_000));
    }

    #[test]
    fn never_scheduled_is_due() {
        assert!(config(true, None).is_due(0));
    }

    #[test]
    fn frequency_offsets() {
        assert_eq!(SyncFrequency::FiveMinutes.interval_millis(), 300_000);
        assert_eq!(SyncFrequency::Hourly.interval_millis(), 3_600_000);
        assert_eq!(SyncFrequency::Daily.interval_millis(), 86_400_000);
        assert_eq!(SyncFrequency::Weekly.interval_millis(), 604_800_000);
    }

    #[test]
    fn status_db_strings() {
        for status in [
            SyncRunStatus::InProgress,
            SyncRunStatus::Success,
            SyncRunStatus::Failed,
            SyncRunStatus::Partial,
        ] {
            assert_eq!(SyncRunStatus::from_db(status.as_db()), Some(status));
        }
        assert!(!SyncRunStatus::InProgress.is_terminal());
        assert!(SyncRunStatus::Partial.is_terminal());
    }
}
