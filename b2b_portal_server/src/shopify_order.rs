use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// The subset of the storefront's order webhook payload the gateway consumes.
///
/// Field names match the external payload exactly. Everything except the order id is optional in the wild;
/// defaulting is handled during normalization, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyOrderEvent {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub customer: Option<ShopifyCustomer>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub current_total_price: Option<String>,
    #[serde(default)]
    pub total_outstanding: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
}

/// Test/support builder for webhook payloads.
#[derive(Debug, Clone, Default)]
pub struct OrderEventBuilder {
    id: Option<i64>,
    customer_id: Option<i64>,
    financial_status: Option<String>,
    fulfillment_status: Option<String>,
    currency: Option<String>,
    total_price: Option<String>,
    current_total_price: Option<String>,
    total_outstanding: Option<String>,
    cancelled_at: Option<String>,
    updated_at: Option<String>,
}

impl OrderEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self, id: i64) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn customer_id(&mut self, customer_id: i64) -> &mut Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn financial_status(&mut self, status: &str) -> &mut Self {
        self.financial_status = Some(status.to_string());
        self
    }

    pub fn fulfillment_status(&mut self, status: &str) -> &mut Self {
        self.fulfillment_status = Some(status.to_string());
        self
    }

    pub fn total_price(&mut self, price: &str) -> &mut Self {
        self.total_price = Some(price.to_string());
        self
    }

    pub fn current_total_price(&mut self, price: &str) -> &mut Self {
        self.current_total_price = Some(price.to_string());
        self
    }

    pub fn total_outstanding(&mut self, outstanding: &str) -> &mut Self {
        self.total_outstanding = Some(outstanding.to_string());
        self
    }

    pub fn cancelled_at(&mut self, timestamp: &str) -> &mut Self {
        self.cancelled_at = Some(timestamp.to_string());
        self
    }

    pub fn build(&self) -> ShopifyOrderEvent {
        let mut rng = rand::thread_rng();
        #[allow(clippy::cast_possible_wrap)]
        let id = self.id.unwrap_or((rng.next_u64() >> 1) as i64);
        let customer = ShopifyCustomer { id: self.customer_id.unwrap_or_else(|| rng.gen_range(1..100_000)), email: None };
        ShopifyOrderEvent {
            id,
            name: Some(format!("#{id}")),
            customer: Some(customer),
            financial_status: self.financial_status.clone(),
            fulfillment_status: self.fulfillment_status.clone(),
            currency: self.currency.clone().or_else(|| Some("USD".to_string())),
            total_price: self.total_price.clone(),
            current_total_price: self.current_total_price.clone(),
            total_outstanding: self.total_outstanding.clone(),
            cancelled_at: self.cancelled_at.clone(),
            created_at: None,
            updated_at: self.updated_at.clone(),
        }
    }
}
