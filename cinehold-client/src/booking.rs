use crate::error::GatewayError;
use async_trait::async_trait;
use cinehold_core::HolderIdentity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Guest-flow booking creation from previously held seats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub showtime_id: String,
    pub selected_seats: Vec<String>,
    pub guest_name: String,
    pub guest_email: String,
    #[serde(flatten)]
    pub holder: HolderIdentity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    pub booking_id: String,
    pub total_price: i64,
    pub seats: Vec<String>,
    pub ttl: u32,
    pub ttl_timestamp: i64,
}

#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<BookingCreated, GatewayError>;
}

pub struct RestBookingGateway {
    http: reqwest::Client,
    base_url: String,
}

impl RestBookingGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait]
impl BookingApi for RestBookingGateway {
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<BookingCreated, GatewayError> {
        let response = self
            .http
            .post(format!("{}/v1/bookings", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus { status: response.status().as_u16() });
        }

        let created: BookingCreated = response.json().await?;
        tracing::info!(booking_id = %created.booking_id, ttl = created.ttl, "booking created");
        Ok(created)
    }
}

/// Hands out fresh booking ids and echoes the request back, for tests
pub struct MockBookingGateway {
    pub ttl: u32,
    pub seat_price: i64,
}

impl MockBookingGateway {
    pub fn new(ttl: u32, seat_price: i64) -> Self {
        Self { ttl, seat_price }
    }
}

#[async_trait]
impl BookingApi for MockBookingGateway {
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<BookingCreated, GatewayError> {
        Ok(BookingCreated {
            booking_id: format!("bk-{}", Uuid::new_v4().simple()),
            total_price: self.seat_price * request.selected_seats.len() as i64,
            seats: request.selected_seats.clone(),
            ttl: self.ttl,
            ttl_timestamp: chrono::Utc::now().timestamp() + i64::from(self.ttl),
        })
    }
}
