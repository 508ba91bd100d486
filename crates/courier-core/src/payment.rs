use crate::types::{PaymentMethod, PaymentStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const ABANDON_REASON: &str = "Payment process not completed within the allowed window";

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Gateway order reference; the key used by callbacks and webhooks.
    pub reference: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        reference: impl Into<String>,
        order_id: impl Into<String>,
        method: PaymentMethod,
        amount: f64,
        currency: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            reference: reference.into(),
            order_id: order_id.into(),
            method,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`, replacing details when new ones are given.
    pub fn transition(&mut self, status: PaymentStatus, details: Option<serde_json::Value>) {
        self.status = status;
        if let Some(d) = details {
            self.details = d;
        }
        self.updated_at = Utc::now();
    }

    /// Pending and created strictly before `now - threshold`.
    pub fn is_abandoned_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status == PaymentStatus::Pending && self.created_at < now - threshold
    }

    /// Flag as abandoned, keeping existing details and stamping when and why.
    pub fn mark_abandoned(&mut self, now: DateTime<Utc>) {
        let mut details = match std::mem::take(&mut self.details) {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("previous".to_string(), other);
                map
            }
        };
        details.insert(
            "abandoned_at".to_string(),
            serde_json::Value::String(now.to_rfc3339()),
        );
        details.insert(
            "reason".to_string(),
            serde_json::Value::String(ABANDON_REASON.to_string()),
        );
        self.details = serde_json::Value::Object(details);
        self.status = PaymentStatus::Abandoned;
        self.updated_at = now;
    }
}

/// Map a PayPal order/capture status onto a local payment status.
///
/// Returns `None` when the gateway status says nothing new.
pub fn status_from_gateway(gateway_status: &str) -> Option<PaymentStatus> {
    match gateway_status {
        "COMPLETED" => Some(PaymentStatus::Paid),
        "APPROVED" => Some(PaymentStatus::Processing),
        "VOIDED" => Some(PaymentStatus::Cancelled),
        "DECLINED" | "DENIED" | "FAILED" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_at(created_at: DateTime<Utc>) -> Payment {
        let mut p = Payment::pending(
            "PAY-1",
            "JS-1-AAAA",
            PaymentMethod::PayPal,
            10.0,
            "USD",
            serde_json::json!({"id": "PAY-1"}),
        );
        p.created_at = created_at;
        p.updated_at = created_at;
        p
    }

    #[test]
    fn abandonment_requires_strictly_older_than_threshold() {
        let now = Utc::now();
        let threshold = Duration::minutes(30);

        assert!(!pending_at(now - Duration::minutes(29)).is_abandoned_at(now, threshold));
        assert!(!pending_at(now - threshold).is_abandoned_at(now, threshold));
        assert!(pending_at(now - Duration::minutes(31)).is_abandoned_at(now, threshold));
    }

    #[test]
    fn only_pending_payments_are_abandoned() {
        let now = Utc::now();
        let mut p = pending_at(now - Duration::hours(2));
        p.status = PaymentStatus::Paid;
        assert!(!p.is_abandoned_at(now, Duration::minutes(30)));
    }

    #[test]
    fn mark_abandoned_merges_details() {
        let now = Utc::now();
        let mut p = pending_at(now - Duration::hours(1));
        p.mark_abandoned(now);
        assert_eq!(p.status, PaymentStatus::Abandoned);
        assert_eq!(p.details["id"], "PAY-1");
        assert_eq!(p.details["reason"], ABANDON_REASON);
        assert!(p.details["abandoned_at"].is_string());
    }

    #[test]
    fn gateway_status_mapping() {
        assert_eq!(status_from_gateway("COMPLETED"), Some(PaymentStatus::Paid));
        assert_eq!(status_from_gateway("VOIDED"), Some(PaymentStatus::Cancelled));
        assert_eq!(status_from_gateway("CREATED"), None);
    }
}
