use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the payment URL is created for: a seat booking or a standalone food
/// & beverage order
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentTarget {
    Booking {
        #[serde(rename = "bookingId")]
        booking_id: String,
    },
    FnbOrder {
        #[serde(rename = "fnbOrderId")]
        fnb_order_id: String,
    },
}

impl PaymentTarget {
    pub fn booking(booking_id: impl Into<String>) -> Self {
        Self::Booking { booking_id: booking_id.into() }
    }

    pub fn fnb_order(fnb_order_id: impl Into<String>) -> Self {
        Self::FnbOrder { fnb_order_id: fnb_order_id.into() }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentUrlResponse {
    order_url: String,
}

/// Result of the status poll after the return-redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Pending,
}

/// Payment collaborator: create a gateway URL to redirect the browser to,
/// then poll the transaction status once the redirect returns. A failed
/// transaction is surfaced to the user; booking/seat cleanup after failure is
/// the server's job, not re-implemented here.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_payment_url(&self, target: &PaymentTarget) -> Result<String, GatewayError>;

    async fn payment_status(&self, transaction_id: &str) -> Result<PaymentOutcome, GatewayError>;
}

pub struct RestPaymentGateway {
    http: reqwest::Client,
    base_url: String,
}

impl RestPaymentGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait]
impl PaymentApi for RestPaymentGateway {
    async fn create_payment_url(&self, target: &PaymentTarget) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(format!("{}/v1/payments/create", self.base_url))
            .json(target)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus { status: response.status().as_u16() });
        }

        let payload: PaymentUrlResponse = response.json().await?;
        Ok(payload.order_url)
    }

    async fn payment_status(&self, transaction_id: &str) -> Result<PaymentOutcome, GatewayError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/status", self.base_url))
            .query(&[("transactionId", transaction_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus { status: response.status().as_u16() });
        }

        Ok(response.json().await?)
    }
}

/// Always-succeeding payment collaborator for tests
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentApi for MockPaymentGateway {
    async fn create_payment_url(&self, target: &PaymentTarget) -> Result<String, GatewayError> {
        let id = match target {
            PaymentTarget::Booking { booking_id } => booking_id,
            PaymentTarget::FnbOrder { fnb_order_id } => fnb_order_id,
        };
        Ok(format!("https://pay.example.com/order/{id}"))
    }

    async fn payment_status(&self, _transaction_id: &str) -> Result<PaymentOutcome, GatewayError> {
        Ok(PaymentOutcome::Succeeded)
    }
}
