use super::{CheckoutRequest, GatewayOrder, PaymentGateway};
use courier_core::{CourierError, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process gateway for development and tests. Orders start `CREATED`,
/// the approval link points straight at the capture callback, and capture
/// completes with `capture_status`.
pub struct MockGateway {
    capture_status: String,
    orders: Mutex<HashMap<String, String>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("COMPLETED")
    }
}

impl MockGateway {
    pub fn new(capture_status: impl Into<String>) -> Self {
        Self {
            capture_status: capture_status.into(),
            orders: Mutex::new(HashMap::new()),
        }
    }

    /// Move a gateway order to `status`, as if the payer acted on it.
    pub fn set_status(&self, reference: &str, status: &str) {
        self.lock().insert(reference.to_string(), status.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.orders.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn order(reference: &str, status: &str) -> GatewayOrder {
        GatewayOrder {
            id: reference.to_string(),
            status: status.to_string(),
            approval_url: None,
            raw: json!({ "id": reference, "status": status }),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_order(&self, request: &CheckoutRequest) -> Result<GatewayOrder> {
        let reference = format!("MOCK-{}", uuid::Uuid::new_v4().simple()).to_uppercase();
        self.set_status(&reference, "CREATED");
        let mut order = Self::order(&reference, "CREATED");
        order.approval_url = Some(format!(
            "{}?token={}&PayerID=MOCKPAYER",
            request.return_url, reference
        ));
        Ok(order)
    }

    async fn capture(&self, reference: &str) -> Result<GatewayOrder> {
        let mut orders = self.lock();
        let status = orders
            .get_mut(reference)
            .ok_or_else(|| CourierError::Gateway(format!("unknown gateway order {reference}")))?;
        *status = self.capture_status.clone();
        Ok(Self::order(reference, status))
    }

    async fn order_details(&self, reference: &str) -> Result<GatewayOrder> {
        let orders = self.lock();
        let status = orders
            .get(reference)
            .ok_or_else(|| CourierError::Gateway(format!("unknown gateway order {reference}")))?;
        Ok(Self::order(reference, status))
    }
}
