use std::time::Instant;

/// Status of an action in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActionStatus {
    /// Forward operation succeeded and the action is still armed.
    Executed,
    /// Forward operation failed.
    Failed,
    /// Action was rolled back during unwind.
    Undone,
    /// Action was committed after the whole chain succeeded.
    Committed,
}

/// Record of one action's execution within a chain.
#[derive(Debug)]
pub struct ActionRecord {
    /// Zero-based position of the action in the chain.
    pub position: usize,
    /// Name of the action.
    pub name: String,
    /// Current status.
    pub status: ActionStatus,
    /// When the forward operation started.
    pub started_at: Instant,
    /// When the action reached its latest status.
    pub completed_at: Option<Instant>,
}

/// Audit log tracking every action attempted by a chain run.
///
/// Actions after a failing one never start and have no record.
#[derive(Debug, Default)]
pub struct ChainAuditLog {
    records: Vec<ActionRecord>,
    undo_order: Vec<usize>,
}

impl ChainAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, position: usize, name: &str) {
        self.records.push(ActionRecord {
            position,
            name: name.to_string(),
            status: ActionStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
        });
    }

    /// Mark the last action as executed successfully.
    pub(crate) fn record_success(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = ActionStatus::Executed;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last action as failed.
    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = ActionStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_undone(&mut self, position: usize) {
        if let Some(record) = self.record_mut(position) {
            record.status = ActionStatus::Undone;
            record.completed_at = Some(Instant::now());
            self.undo_order.push(position);
        }
    }

    /// Mark every executed action as committed.
    pub(crate) fn record_all_committed(&mut self) {
        let now = Instant::now();
        for record in &mut self.records {
            if record.status == ActionStatus::Executed {
                record.status = ActionStatus::Committed;
                record.completed_at = Some(now);
            }
        }
    }

    fn record_mut(&mut self, position: usize) -> Option<&mut ActionRecord> {
        self.records
            .iter_mut()
            .find(|record| record.position == position)
    }

    /// Get all records in the audit log, in execution order.
    #[must_use]
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Positions of undone actions, in the order their compensations ran.
    #[must_use]
    pub fn undo_order(&self) -> &[usize] {
        &self.undo_order
    }

    /// Get a summary of the chain run for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                ActionStatus::Executed => "•",
                ActionStatus::Failed => "✗",
                ActionStatus::Undone => "↩",
                ActionStatus::Committed => "✓",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}
