//! Payment gateway seam. Handlers only see `PaymentGateway`; the PayPal
//! REST client and the in-process mock both sit behind it.

use courier_core::Result;

pub mod mock;
pub mod paypal;

pub use mock::MockGateway;
pub use paypal::PayPalGateway;

/// What the gateway needs to open a checkout for one order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    /// Where the payer lands after approving.
    pub return_url: String,
    /// Where the payer lands after backing out.
    pub cancel_url: String,
}

/// Normalized view of a gateway-side order.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    /// Gateway order id; stored as the payment reference.
    pub id: String,
    /// Raw gateway status, e.g. `CREATED`, `APPROVED`, `COMPLETED`.
    pub status: String,
    pub approval_url: Option<String>,
    pub raw: serde_json::Value,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_order(&self, request: &CheckoutRequest) -> Result<GatewayOrder>;

    /// Capture an approved order.
    async fn capture(&self, reference: &str) -> Result<GatewayOrder>;

    async fn order_details(&self, reference: &str) -> Result<GatewayOrder>;
}
