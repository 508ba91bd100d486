//! Optional copy of every order into an external table.
//!
//! The canonical `Order` never carries display names; `airtable_fields` is
//! the one place that maps it onto the Airtable column layout.

use async_trait::async_trait;
use courier_core::config::AirtableConfig;
use courier_core::order::Order;
use courier_core::{CourierError, Result};
use serde_json::{json, Value};

#[async_trait]
pub trait OrderMirror: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record a new order; returns the external record id when there is one.
    async fn order_created(&self, order: &Order) -> Result<Option<String>>;

    /// Push the order's current status.
    async fn status_changed(&self, order: &Order) -> Result<()>;
}

// ---------------------------------------------------------------------------
// NoopMirror
// ---------------------------------------------------------------------------

pub struct NoopMirror;

#[async_trait]
impl OrderMirror for NoopMirror {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn order_created(&self, _order: &Order) -> Result<Option<String>> {
        Ok(None)
    }

    async fn status_changed(&self, _order: &Order) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AirtableMirror
// ---------------------------------------------------------------------------

pub struct AirtableMirror {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl AirtableMirror {
    pub fn new(client: reqwest::Client, cfg: &AirtableConfig) -> Result<Self> {
        let (Some(base_id), Some(api_key)) = (cfg.base_id.as_ref(), cfg.api_key.as_ref()) else {
            return Err(CourierError::Config(
                "airtable mirror needs base_id and api_key".into(),
            ));
        };
        Ok(Self {
            client,
            table_url: format!(
                "{}/{}/{}",
                cfg.api_base.trim_end_matches('/'),
                base_id,
                cfg.table
            ),
            api_key: api_key.clone(),
        })
    }

    async fn send(&self, method: reqwest::Method, body: Value) -> Result<Value> {
        let resp = self
            .client
            .request(method, &self.table_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CourierError::Mirror(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Mirror(format!("HTTP {status}: {text}")));
        }
        resp.json()
            .await
            .map_err(|e| CourierError::Mirror(e.to_string()))
    }
}

#[async_trait]
impl OrderMirror for AirtableMirror {
    fn name(&self) -> &'static str {
        "airtable"
    }

    async fn order_created(&self, order: &Order) -> Result<Option<String>> {
        let body = json!({ "records": [{ "fields": airtable_fields(order) }] });
        let resp = self.send(reqwest::Method::POST, body).await?;
        Ok(resp["records"][0]["id"].as_str().map(str::to_string))
    }

    async fn status_changed(&self, order: &Order) -> Result<()> {
        let Some(record_id) = order.external_ref.as_deref() else {
            return Ok(());
        };
        let body = json!({
            "records": [{
                "id": record_id,
                "fields": { "Status": order.status.label() },
            }]
        });
        self.send(reqwest::Method::PATCH, body).await?;
        Ok(())
    }
}

/// Canonical order → Airtable display-name columns.
pub fn airtable_fields(order: &Order) -> Value {
    let mut fields = json!({
        "Status": order.status.label(),
        "Created At": order.created_at.to_rfc3339(),
        "Sender Name": order.sender_name,
        "Sender Phone": order.sender_phone,
        "Receiver Name": order.receiver_name,
        "Receiver Phone": order.receiver_phone,
        "Pickup Address": order.pickup_address,
        "Delivery Address": order.delivery_address,
        "Item Type": order.item_type,
        "Item Size": order.item_size,
        "Item Weight": order.item_weight.as_deref().unwrap_or("Light"),
        "Special Requirements": order.special_requirements.as_deref().unwrap_or(""),
        "Payment Status": order
            .payment_status
            .map(|s| s.as_str())
            .unwrap_or("Unpaid"),
    });
    if let Some(d) = order.distance {
        fields["Distance"] = json!(d);
    }
    if let Some(t) = order.estimated_time {
        fields["Estimated Time"] = json!(t);
    }
    if let Some(p) = order.price {
        fields["Price"] = json!(p);
    }
    fields
}
