use crate::identity::HolderIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Seat state as reported by the seat-lock service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    /// Held by the requesting holder
    Locked,
    /// Held by somebody else
    AlreadyLocked,
    /// Permanently taken
    Booked,
}

/// One push message from the seat-lock channel, emitted per seat-state change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatUpdate {
    pub showtime_id: String,
    pub seat_id: String,
    pub status: SeatStatus,
    /// Seconds remaining on the hold, when one exists
    pub ttl: Option<u32>,
}

/// Per-seat outcome of a batch lock request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatLockResult {
    pub seat_id: String,
    pub status: SeatStatus,
    pub ttl: Option<u32>,
}

/// The client's projection of one holder's temporary claim on seats for a
/// showtime.
///
/// The authoritative state lives in the seat-lock service; this is an
/// eventually-consistent cache fed by direct lock/unlock calls and by push
/// updates, applied last-write-wins per seat. At most one of these exists per
/// (showtime, holder) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldSession {
    pub showtime_id: String,
    pub holder: HolderIdentity,
    pub locked_seats: BTreeSet<String>,
    /// Remaining seconds at the last sync point; `None` means no active hold
    pub ttl_seconds: Option<u32>,
    /// When `ttl_seconds` was last authoritative
    pub ttl_synced_at: Option<DateTime<Utc>>,
}

impl HoldSession {
    pub fn new(showtime_id: impl Into<String>, holder: HolderIdentity) -> Self {
        Self {
            showtime_id: showtime_id.into(),
            holder,
            locked_seats: BTreeSet::new(),
            ttl_seconds: None,
            ttl_synced_at: None,
        }
    }

    /// Fold a batch lock response into the session.
    ///
    /// Seats that came back `LOCKED` join the hold; anything else stays out.
    /// Returns the ids of the rejected seats so the caller can deselect them
    /// and tell the user. Partial success is the norm, not an error.
    pub fn apply_lock_results(
        &mut self,
        results: &[SeatLockResult],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut rejected = Vec::new();

        for result in results {
            match result.status {
                SeatStatus::Locked => {
                    self.locked_seats.insert(result.seat_id.clone());
                    if let Some(ttl) = result.ttl {
                        self.resync_ttl(ttl, now);
                    }
                }
                _ => rejected.push(result.seat_id.clone()),
            }
        }

        rejected
    }

    /// Apply one push update, last-write-wins for that seat.
    ///
    /// Updates for other showtimes are ignored. A seat of ours that the server
    /// now reports `AVAILABLE` or `BOOKED` has left the hold (expiry, release
    /// elsewhere, or finalization) and is dropped.
    pub fn apply(&mut self, update: &SeatUpdate, now: DateTime<Utc>) {
        if update.showtime_id != self.showtime_id {
            return;
        }

        match update.status {
            SeatStatus::Available | SeatStatus::Booked => {
                if self.locked_seats.remove(&update.seat_id) {
                    tracing::debug!(seat_id = %update.seat_id, status = ?update.status, "held seat released by server");
                }
                if self.locked_seats.is_empty() {
                    self.ttl_seconds = None;
                    self.ttl_synced_at = None;
                }
            }
            SeatStatus::Locked | SeatStatus::AlreadyLocked => {
                if self.locked_seats.contains(&update.seat_id) {
                    if let Some(ttl) = update.ttl {
                        self.resync_ttl(ttl, now);
                    }
                }
            }
        }
    }

    /// Record a fresh authoritative TTL
    pub fn resync_ttl(&mut self, ttl_seconds: u32, now: DateTime<Utc>) {
        self.ttl_seconds = Some(ttl_seconds);
        self.ttl_synced_at = Some(now);
    }

    /// Remaining seconds derived from the last sync point, `None` without an
    /// active hold
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<u32> {
        let ttl = self.ttl_seconds?;
        let synced_at = self.ttl_synced_at?;
        let elapsed = (now - synced_at).num_seconds().max(0) as u32;
        Some(ttl.saturating_sub(elapsed))
    }

    pub fn has_active_hold(&self) -> bool {
        !self.locked_seats.is_empty() && self.ttl_seconds.is_some()
    }

    /// Drop all local claim state (expiry, release, or finalized booking)
    pub fn release(&mut self) {
        self.locked_seats.clear();
        self.ttl_seconds = None;
        self.ttl_synced_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(seat: &str, ttl: u32) -> SeatLockResult {
        SeatLockResult { seat_id: seat.to_string(), status: SeatStatus::Locked, ttl: Some(ttl) }
    }

    fn conflicted(seat: &str) -> SeatLockResult {
        SeatLockResult { seat_id: seat.to_string(), status: SeatStatus::AlreadyLocked, ttl: None }
    }

    #[test]
    fn test_partial_lock_success() {
        let mut session = HoldSession::new("st-1", HolderIdentity::guest("g-1"));
        let now = Utc::now();

        let rejected = session.apply_lock_results(
            &[locked("A", 300), conflicted("B"), locked("C", 300)],
            now,
        );

        assert_eq!(rejected, vec!["B".to_string()]);
        assert!(session.locked_seats.contains("A"));
        assert!(session.locked_seats.contains("C"));
        assert!(!session.locked_seats.contains("B"));
        assert_eq!(session.ttl_seconds, Some(300));
    }

    #[test]
    fn test_push_update_drops_released_seat() {
        let mut session = HoldSession::new("st-1", HolderIdentity::guest("g-1"));
        let now = Utc::now();
        session.apply_lock_results(&[locked("A", 300)], now);

        session.apply(
            &SeatUpdate {
                showtime_id: "st-1".to_string(),
                seat_id: "A".to_string(),
                status: SeatStatus::Available,
                ttl: None,
            },
            now,
        );

        assert!(session.locked_seats.is_empty());
        assert!(!session.has_active_hold());
    }

    #[test]
    fn test_push_update_for_other_showtime_ignored() {
        let mut session = HoldSession::new("st-1", HolderIdentity::guest("g-1"));
        let now = Utc::now();
        session.apply_lock_results(&[locked("A", 300)], now);

        session.apply(
            &SeatUpdate {
                showtime_id: "st-2".to_string(),
                seat_id: "A".to_string(),
                status: SeatStatus::Available,
                ttl: None,
            },
            now,
        );

        assert!(session.locked_seats.contains("A"));
    }

    #[test]
    fn test_remaining_derived_from_sync_point() {
        let mut session = HoldSession::new("st-1", HolderIdentity::user("u-1"));
        let synced = Utc::now();
        session.resync_ttl(300, synced);

        let later = synced + chrono::Duration::seconds(40);
        assert_eq!(session.remaining_at(later), Some(260));

        let past_expiry = synced + chrono::Duration::seconds(500);
        assert_eq!(session.remaining_at(past_expiry), Some(0));
    }
}
