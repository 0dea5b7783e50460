//! Queue ranking, the explicit queue-entry state machine, and the deposit
//! gate planner.
//!
//! Rank is never stored: it is an entry's 1-based position among ranked
//! entries (`queued`, `deposit_required`, `active`) ordered by `created_at`,
//! recomputed every cycle.

use serde::Serialize;

use crate::error::CoreError;
use crate::status::{DepositStatus, QueueStatus};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Queue entry
// ---------------------------------------------------------------------------

/// A customer's place in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub id: DbId,
    pub customer_id: DbId,
    pub created_at: Timestamp,
    pub status: QueueStatus,
    pub deposit_status: DepositStatus,
    pub deposit_required_at: Option<Timestamp>,
    pub deposit_paid_at: Option<Timestamp>,
    pub deposit_expires_at: Option<Timestamp>,
    pub booked_at: Option<Timestamp>,
    pub booked_location_id: Option<DbId>,
    pub booked_slot_at: Option<Timestamp>,
}

impl QueueEntry {
    /// Only active entries with a paid deposit may receive a slot.
    pub fn is_eligible(&self) -> bool {
        self.status == QueueStatus::Active && self.deposit_status == DepositStatus::Paid
    }
}

/// Order entries into this cycle's ranking.
///
/// Drops entries outside the ranked statuses and sorts by `created_at`.
/// The sort is stable, so equal timestamps keep their fetched order.
pub fn rank_queue(mut entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    entries.retain(|e| e.status.is_ranked());
    entries.sort_by_key(|e| e.created_at);
    entries
}

/// Whether a 1-based rank falls within the top `threshold` positions.
pub fn within_rank(rank: usize, threshold: usize) -> bool {
    rank >= 1 && rank <= threshold
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Condition on an entry's current `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGuard {
    Is(QueueStatus),
    IsNot(QueueStatus),
}

impl StatusGuard {
    pub fn allows(self, status: QueueStatus) -> bool {
        match self {
            StatusGuard::Is(s) => status == s,
            StatusGuard::IsNot(s) => status != s,
        }
    }
}

/// One row of the transition table: `(status, deposit) -> (status, deposit)`.
///
/// Repositories build their conditional `UPDATE ... WHERE` clauses from the
/// same rule, so a concurrent writer that lost the race affects zero rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from_status: StatusGuard,
    pub from_deposit: DepositStatus,
    pub to_status: QueueStatus,
    pub to_deposit: DepositStatus,
}

/// A state change the dispatcher may apply to a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTransition {
    /// Ask a top-ranked entry to pay a deposit before `expires_at`.
    RequireDeposit { expires_at: Timestamp },
    /// The deposit hold lapsed; the entry goes back to plain `queued`.
    ExpireDeposit,
    /// The entry won a slot and the booking succeeded.
    Book { location_id: DbId, slot_at: Timestamp },
}

impl QueueTransition {
    pub fn name(&self) -> &'static str {
        match self {
            QueueTransition::RequireDeposit { .. } => "require_deposit",
            QueueTransition::ExpireDeposit => "expire_deposit",
            QueueTransition::Book { .. } => "book",
        }
    }

    /// The table row for this transition.
    pub fn rule(&self) -> TransitionRule {
        match self {
            QueueTransition::RequireDeposit { .. } => TransitionRule {
                from_status: StatusGuard::IsNot(QueueStatus::Booked),
                from_deposit: DepositStatus::None,
                to_status: QueueStatus::DepositRequired,
                to_deposit: DepositStatus::Required,
            },
            QueueTransition::ExpireDeposit => TransitionRule {
                from_status: StatusGuard::IsNot(QueueStatus::Booked),
                from_deposit: DepositStatus::Required,
                to_status: QueueStatus::Queued,
                to_deposit: DepositStatus::Expired,
            },
            QueueTransition::Book { .. } => TransitionRule {
                from_status: StatusGuard::Is(QueueStatus::Active),
                from_deposit: DepositStatus::Paid,
                to_status: QueueStatus::Booked,
                to_deposit: DepositStatus::Paid,
            },
        }
    }

    /// Whether the entry's current state admits this transition at `now`.
    pub fn guard(&self, entry: &QueueEntry, now: Timestamp) -> bool {
        let rule = self.rule();
        if !rule.from_status.allows(entry.status) || entry.deposit_status != rule.from_deposit {
            return false;
        }
        match self {
            QueueTransition::ExpireDeposit => entry.deposit_expires_at.is_some_and(|at| at < now),
            _ => true,
        }
    }

    /// Like [`guard`](Self::guard) but with a descriptive error.
    pub fn validate(&self, entry: &QueueEntry, now: Timestamp) -> Result<(), CoreError> {
        if self.guard(entry, now) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Invalid transition {} for queue entry {} ({}/{})",
                self.name(),
                entry.id,
                entry.status,
                entry.deposit_status
            )))
        }
    }

    /// Apply the transition to an in-memory entry, stamping timestamps.
    ///
    /// Leaves the entry untouched and returns the guard's error when the
    /// entry's state does not admit the transition.
    pub fn apply(&self, entry: &mut QueueEntry, now: Timestamp) -> Result<(), CoreError> {
        self.validate(entry, now)?;
        let rule = self.rule();
        entry.status = rule.to_status;
        entry.deposit_status = rule.to_deposit;
        match *self {
            QueueTransition::RequireDeposit { expires_at } => {
                entry.deposit_required_at = Some(now);
                entry.deposit_expires_at = Some(expires_at);
            }
            QueueTransition::ExpireDeposit => {}
            QueueTransition::Book {
                location_id,
                slot_at,
            } => {
                entry.booked_at = Some(now);
                entry.booked_location_id = Some(location_id);
                entry.booked_slot_at = Some(slot_at);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deposit gate
// ---------------------------------------------------------------------------

/// A planned deposit-gate transition for one ranked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateAction {
    /// Index into the ranked slice.
    pub index: usize,
    /// 1-based rank.
    pub rank: usize,
    pub entry_id: DbId,
    pub transition: QueueTransition,
}

/// Plan the deposit gate over a ranked queue snapshot.
///
/// - Entries ranked within `deposit_rank` that still have no deposit are
///   asked for one, expiring at `now + grace`.
/// - Any entry whose deposit hold has lapsed is expired, whatever its rank.
///
/// Planning is deterministic: re-planning the snapshot produced by applying
/// these actions yields nothing. Fails if `now + grace` is not representable.
pub fn plan_deposit_gate(
    ranked: &[QueueEntry],
    deposit_rank: usize,
    grace: chrono::Duration,
    now: Timestamp,
) -> Result<Vec<GateAction>, CoreError> {
    let expires_at = now.checked_add_signed(grace).ok_or_else(|| {
        CoreError::Validation(format!("Deposit grace of {grace} overflows from {now}"))
    })?;
    let require = QueueTransition::RequireDeposit { expires_at };
    let expire = QueueTransition::ExpireDeposit;

    let mut actions = Vec::new();
    for (index, entry) in ranked.iter().enumerate() {
        let rank = index + 1;
        let transition = if within_rank(rank, deposit_rank) && require.guard(entry, now) {
            require
        } else if expire.guard(entry, now) {
            expire
        } else {
            continue;
        };
        actions.push(GateAction {
            index,
            rank,
            entry_id: entry.id,
            transition,
        });
    }
    Ok(actions)
}
