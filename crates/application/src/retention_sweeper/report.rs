use chrono::{DateTime, Utc};

/// Storage area cleaned by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepTarget {
    /// Entries in the activity log store.
    ActivityLog,
    /// Soft-deleted contracts in the business datastore.
    SoftDeletedContracts,
    /// Recorded field changes, kept longer than the entries that produced them.
    FieldHistory,
}

impl SweepTarget {
    /// Returns a stable label for logs and transport.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivityLog => "activity_log",
            Self::SoftDeletedContracts => "soft_deleted_contracts",
            Self::FieldHistory => "field_history",
        }
    }
}

/// Result of sweeping one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTargetReport {
    /// Swept target.
    pub target: SweepTarget,
    /// Rows older than this instant were eligible for this target.
    pub cutoff: DateTime<Utc>,
    /// Rows permanently deleted.
    pub deleted: u64,
    /// Committed batches, including the final short one.
    pub batches: u32,
    /// Error that stopped this target, if any.
    pub error: Option<String>,
}

impl SweepTargetReport {
    pub(super) fn new(target: SweepTarget, cutoff: DateTime<Utc>) -> Self {
        Self {
            target,
            cutoff,
            deleted: 0,
            batches: 0,
            error: None,
        }
    }
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Reference time of the run.
    pub swept_at: DateTime<Utc>,
    /// Cutoff of the main retention window.
    pub cutoff: DateTime<Utc>,
    /// Per-target results in sweep order.
    pub targets: Vec<SweepTargetReport>,
}

impl SweepReport {
    /// Returns rows deleted across all targets.
    #[must_use]
    pub fn total_deleted(&self) -> u64 {
        self.targets
            .iter()
            .fold(0_u64, |total, target| total.saturating_add(target.deleted))
    }

    /// Returns whether at least one target stopped on an error.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.targets.iter().any(|target| target.error.is_some())
    }

    /// Returns rows deleted for one target.
    #[must_use]
    pub fn deleted_for(&self, target: SweepTarget) -> u64 {
        self.targets
            .iter()
            .find(|report| report.target == target)
            .map_or(0, |report| report.deleted)
    }
}

/// Retention state relative to the current cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionStatistics {
    /// Rows older than this instant are eligible for purge.
    pub cutoff: DateTime<Utc>,
    /// Retention window in days.
    pub window_days: u16,
    /// Log entries the next sweep would delete.
    pub activity_entries_ready: u64,
    /// Soft-deleted records the next sweep would purge.
    pub soft_deleted_ready: u64,
    /// Soft-deleted records still inside the window.
    pub soft_deleted_restorable: u64,
    /// Field changes older than this instant are eligible for purge.
    pub field_history_cutoff: DateTime<Utc>,
    /// Field history retention window in days.
    pub field_history_window_days: u16,
    /// Field changes the next sweep would delete.
    pub field_changes_ready: u64,
}
