use crate::error::GatewayError;
use async_trait::async_trait;
use cinehold_core::{HolderIdentity, SeatLockResult, SeatStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One seat in a lock request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub seat_id: String,
    pub seat_type: String,
    pub ticket_type: String,
}

impl SeatRequest {
    pub fn standard(seat_id: impl Into<String>) -> Self {
        Self {
            seat_id: seat_id.into(),
            seat_type: "STANDARD".to_string(),
            ticket_type: "ADULT".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LockRequest<'a> {
    showtime_id: &'a str,
    #[serde(flatten)]
    holder: &'a HolderIdentity,
    seats: &'a [SeatRequest],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlockRequest<'a> {
    showtime_id: &'a str,
    seat_id: &'a str,
    #[serde(flatten)]
    holder: &'a HolderIdentity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatusResponse {
    pub status: SeatStatus,
    pub ttl: Option<u32>,
}

/// Direct, user-initiated seat lock operations against the seat-lock service.
///
/// Locking reports per-seat outcomes; a conflict on one seat of a batch is a
/// normal result, not a failure of the batch. Unlocking is best-effort: the
/// server expires holds by TTL anyway, so an unlock that fails on the network
/// is logged and swallowed rather than blocking navigation.
#[async_trait]
pub trait SeatLockApi: Send + Sync {
    async fn lock_seats(
        &self,
        showtime_id: &str,
        holder: &HolderIdentity,
        seats: &[SeatRequest],
    ) -> Result<Vec<SeatLockResult>, GatewayError>;

    async fn unlock_seat(&self, showtime_id: &str, seat_id: &str, holder: &HolderIdentity);

    async fn seat_status(
        &self,
        showtime_id: &str,
        seat_id: &str,
    ) -> Result<SeatStatusResponse, GatewayError>;

    /// Release every seat concurrently, so an abandoning user gives the seats
    /// back as fast as possible. Each unlock fails independently.
    async fn unlock_all(&self, showtime_id: &str, seat_ids: &[String], holder: &HolderIdentity) {
        let unlocks = seat_ids
            .iter()
            .map(|seat_id| self.unlock_seat(showtime_id, seat_id, holder));
        futures_util::future::join_all(unlocks).await;
    }
}

/// REST implementation of [`SeatLockApi`]
pub struct RestSeatLockGateway {
    http: reqwest::Client,
    base_url: String,
}

impl RestSeatLockGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait]
impl SeatLockApi for RestSeatLockGateway {
    async fn lock_seats(
        &self,
        showtime_id: &str,
        holder: &HolderIdentity,
        seats: &[SeatRequest],
    ) -> Result<Vec<SeatLockResult>, GatewayError> {
        let response = self
            .http
            .post(format!("{}/v1/seat-locks/lock", self.base_url))
            .json(&LockRequest { showtime_id, holder, seats })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus { status: response.status().as_u16() });
        }

        let results: Vec<SeatLockResult> = response.json().await?;
        let conflicts = results.iter().filter(|r| r.status != SeatStatus::Locked).count();
        tracing::info!(
            showtime_id,
            requested = seats.len(),
            conflicts,
            "seat lock response received"
        );
        Ok(results)
    }

    async fn unlock_seat(&self, showtime_id: &str, seat_id: &str, holder: &HolderIdentity) {
        let request = self
            .http
            .post(format!("{}/v1/seat-locks/unlock", self.base_url))
            .json(&UnlockRequest { showtime_id, seat_id, holder })
            .send()
            .await;

        // Server-side TTL expiry is the backstop; an unlock that fails here
        // never blocks the caller.
        match request {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(showtime_id, seat_id, status = response.status().as_u16(), "unlock rejected");
            }
            Err(err) => {
                tracing::warn!(showtime_id, seat_id, error = %err, "unlock request failed");
            }
            Ok(_) => {}
        }
    }

    async fn seat_status(
        &self,
        showtime_id: &str,
        seat_id: &str,
    ) -> Result<SeatStatusResponse, GatewayError> {
        let response = self
            .http
            .get(format!("{}/v1/seat-locks/status", self.base_url))
            .query(&[("showtimeId", showtime_id), ("seatId", seat_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus { status: response.status().as_u16() });
        }

        Ok(response.json().await?)
    }
}

/// Scriptable in-memory seat-lock service for tests and offline development
#[derive(Default)]
pub struct MockSeatLockGateway {
    /// Seats whose lock attempts should conflict or come back booked
    taken: std::sync::Mutex<std::collections::HashMap<String, SeatStatus>>,
    /// Every unlock call, in arrival order
    unlocked: std::sync::Mutex<Vec<String>>,
    pub ttl_seconds: u32,
}

impl MockSeatLockGateway {
    pub fn new(ttl_seconds: u32) -> Self {
        Self { ttl_seconds, ..Self::default() }
    }

    pub fn mark_taken(&self, seat_id: impl Into<String>, status: SeatStatus) {
        if let Ok(mut taken) = self.taken.lock() {
            taken.insert(seat_id.into(), status);
        }
    }

    pub fn unlock_calls(&self) -> Vec<String> {
        self.unlocked.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SeatLockApi for MockSeatLockGateway {
    async fn lock_seats(
        &self,
        _showtime_id: &str,
        _holder: &HolderIdentity,
        seats: &[SeatRequest],
    ) -> Result<Vec<SeatLockResult>, GatewayError> {
        let taken = self.taken.lock().map(|t| t.clone()).unwrap_or_default();
        Ok(seats
            .iter()
            .map(|seat| match taken.get(&seat.seat_id) {
                Some(status) => SeatLockResult {
                    seat_id: seat.seat_id.clone(),
                    status: *status,
                    ttl: None,
                },
                None => SeatLockResult {
                    seat_id: seat.seat_id.clone(),
                    status: SeatStatus::Locked,
                    ttl: Some(self.ttl_seconds),
                },
            })
            .collect())
    }

    async fn unlock_seat(&self, _showtime_id: &str, seat_id: &str, _holder: &HolderIdentity) {
        if let Ok(mut unlocked) = self.unlocked.lock() {
            unlocked.push(seat_id.to_string());
        }
    }

    async fn seat_status(
        &self,
        _showtime_id: &str,
        seat_id: &str,
    ) -> Result<SeatStatusResponse, GatewayError> {
        let taken = self.taken.lock().map(|t| t.clone()).unwrap_or_default();
        Ok(match taken.get(seat_id) {
            Some(status) => SeatStatusResponse { status: *status, ttl: None },
            None => SeatStatusResponse { status: SeatStatus::Available, ttl: None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_request_carries_exactly_one_identity_field() {
        let holder = HolderIdentity::guest("g-1");
        let seats = vec![SeatRequest::standard("A1")];
        let request = LockRequest { showtime_id: "st-1", holder: &holder, seats: &seats };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["showtimeId"], "st-1");
        assert_eq!(json["guestSessionId"], "g-1");
        assert!(json.get("userId").is_none());
        assert_eq!(json["seats"][0]["seatId"], "A1");
    }

    #[tokio::test]
    async fn test_mock_partial_lock() {
        let gateway = MockSeatLockGateway::new(300);
        gateway.mark_taken("B", SeatStatus::AlreadyLocked);

        let seats: Vec<_> = ["A", "B", "C"].iter().map(|s| SeatRequest::standard(*s)).collect();
        let results = gateway
            .lock_seats("st-1", &HolderIdentity::guest("g-1"), &seats)
            .await
            .unwrap();

        assert_eq!(results[0].status, SeatStatus::Locked);
        assert_eq!(results[1].status, SeatStatus::AlreadyLocked);
        assert_eq!(results[2].status, SeatStatus::Locked);
    }

    #[tokio::test]
    async fn test_unlock_all_reaches_every_seat() {
        let gateway = MockSeatLockGateway::new(300);
        let holder = HolderIdentity::user("u-1");
        let seats = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        gateway.unlock_all("st-1", &seats, &holder).await;

        let mut calls = gateway.unlock_calls();
        calls.sort();
        assert_eq!(calls, seats);
    }
}
