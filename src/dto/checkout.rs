use serde::Deserialize;
use utoipa::ToSchema;

use crate::dto::orders::AdHocLine;
use crate::payment::CreditCard;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteCheckoutRequest {
    /// Explicit line items. When absent (or empty) the caller's cart is
    /// checked out instead.
    #[serde(default)]
    pub items: Option<Vec<AdHocLine>>,
    /// Client-side display total; the order total is always recomputed from
    /// the stored unit prices.
    #[serde(default)]
    pub total: Option<i64>,
    pub delivery_address: String,
    pub delivery_method: String,
    /// `credit_card` or `cash_on_delivery`.
    pub payment_method: String,
    pub credit_card: Option<CreditCard>,
}
