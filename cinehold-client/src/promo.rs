use crate::error::GatewayError;
use async_trait::async_trait;
use cinehold_pricing::Promotion;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Why a promotion code was refused; every variant is user-facing
#[derive(Debug, thiserror::Error)]
pub enum PromoError {
    #[error("Promotion code is not valid")]
    Invalid,

    #[error("Promotion code has expired")]
    Expired,

    #[error("Promotion code has already been used")]
    AlreadyUsed,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[async_trait]
pub trait PromotionApi: Send + Sync {
    /// Validate a code and return the discount snapshot to apply
    async fn validate(&self, code: &str) -> Result<Promotion, PromoError>;
}

pub struct RestPromotionGateway {
    http: reqwest::Client,
    base_url: String,
}

impl RestPromotionGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait]
impl PromotionApi for RestPromotionGateway {
    async fn validate(&self, code: &str) -> Result<Promotion, PromoError> {
        let response = self
            .http
            .get(format!("{}/v1/promotions/{}/validate", self.base_url, code))
            .send()
            .await
            .map_err(GatewayError::from)?;

        match response.status().as_u16() {
            404 => Err(PromoError::Invalid),
            410 => Err(PromoError::Expired),
            409 => Err(PromoError::AlreadyUsed),
            status if !response.status().is_success() => {
                Err(GatewayError::UnexpectedStatus { status }.into())
            }
            _ => Ok(response.json().await.map_err(GatewayError::from)?),
        }
    }
}

/// Fixed code table for tests
#[derive(Default)]
pub struct MockPromotionGateway {
    promotions: Mutex<HashMap<String, Promotion>>,
}

impl MockPromotionGateway {
    pub fn with(promotions: impl IntoIterator<Item = Promotion>) -> Self {
        let map = promotions.into_iter().map(|p| (p.code.clone(), p)).collect();
        Self { promotions: Mutex::new(map) }
    }
}

#[async_trait]
impl PromotionApi for MockPromotionGateway {
    async fn validate(&self, code: &str) -> Result<Promotion, PromoError> {
        self.promotions
            .lock()
            .ok()
            .and_then(|map| map.get(code).cloned())
            .ok_or(PromoError::Invalid)
    }
}
