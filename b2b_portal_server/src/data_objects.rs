use std::fmt::Display;

use bcg_common::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Interactive credit admission request from the checkout-time caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOrderRequest {
    pub company_id: i64,
    pub user_id: i64,
    pub amount: Money,
}

/// Administrative change to a company's credit limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLimitUpdate {
    pub credit_limit: Money,
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Administrative change to a user's personal sub-limit. A null limit clears the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreditLimitUpdate {
    #[serde(default)]
    pub credit_limit: Option<Money>,
}
