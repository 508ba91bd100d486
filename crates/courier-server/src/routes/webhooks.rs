use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use courier_core::types::PaymentStatus;
use courier_core::CourierError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::error::AppError;
use crate::ledger;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event_type: String,
    #[serde(default)]
    resource: Value,
}

/// Check `signature` (base64) against HMAC-SHA256 of `body` under `secret`.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), CourierError> {
    let sig = signature
        .and_then(|s| STANDARD.decode(s.trim()).ok())
        .ok_or(CourierError::SignatureMismatch)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| CourierError::Config(format!("webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&sig)
        .map_err(|_| CourierError::SignatureMismatch)
}

/// Base64 HMAC-SHA256 of `body`; what a sender puts in the signature header.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, CourierError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| CourierError::Config(format!("webhook secret: {e}")))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn status_for_event(event_type: &str) -> Option<PaymentStatus> {
    match event_type {
        "PAYMENT.CAPTURE.COMPLETED" => Some(PaymentStatus::Paid),
        "PAYMENT.CAPTURE.DENIED" => Some(PaymentStatus::Failed),
        "PAYMENT.CAPTURE.REFUNDED" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// POST /api/webhooks/paypal: apply capture events to the matching payment.
pub async fn paypal_webhook(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if let Some(secret) = app.config.payments.webhook_secret.as_deref() {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verify_signature(secret, &body, signature)?;
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| CourierError::InvalidWebhook(format!("malformed event: {e}")))?;

    let Some(status) = status_for_event(&event.event_type) else {
        tracing::debug!(event_type = %event.event_type, "webhook event ignored");
        return Ok(Json(json!({ "received": true })));
    };

    let reference = event.resource["supplementary_data"]["related_ids"]["order_id"]
        .as_str()
        .ok_or_else(|| {
            CourierError::InvalidWebhook(format!(
                "{} without supplementary_data.related_ids.order_id",
                event.event_type
            ))
        })?
        .to_string();

    let details = match status {
        PaymentStatus::Paid => Some(json!({
            "event_type": event.event_type,
            "capture_id": event.resource["id"],
            "capture": event.resource,
        })),
        _ => Some(json!({
            "event_type": event.event_type,
            "resource": event.resource,
        })),
    };

    match ledger::record_status(&*app.payments, &*app.orders, &reference, status, details) {
        Ok(_) => {}
        Err(CourierError::PaymentNotFound(_)) => {
            tracing::warn!(reference = %reference, event_type = %event.event_type, "webhook for unknown payment");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips_and_rejects_tampering() {
        let body = br#"{"event_type":"PAYMENT.CAPTURE.COMPLETED"}"#;
        let sig = sign("s3cret", body).unwrap();
        assert!(verify_signature("s3cret", body, Some(&sig)).is_ok());
        assert!(matches!(
            verify_signature("s3cret", b"{}", Some(&sig)),
            Err(CourierError::SignatureMismatch)
        ));
        assert!(matches!(
            verify_signature("other", body, Some(&sig)),
            Err(CourierError::SignatureMismatch)
        ));
    }

    #[test]
    fn missing_or_garbled_signature_is_rejected() {
        assert!(verify_signature("k", b"x", None).is_err());
        assert!(verify_signature("k", b"x", Some("not base64!")).is_err());
    }

    #[test]
    fn capture_events_map_to_statuses() {
        assert_eq!(
            status_for_event("PAYMENT.CAPTURE.COMPLETED"),
            Some(PaymentStatus::Paid)
        );
        assert_eq!(
            status_for_event("PAYMENT.CAPTURE.DENIED"),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(
            status_for_event("PAYMENT.CAPTURE.REFUNDED"),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(status_for_event("CHECKOUT.ORDER.APPROVED"), None);
    }
}
