//! Payment status changes and the order fields that mirror them.

use courier_core::payment::Payment;
use courier_core::store::{OrderStore, PaymentStore};
use courier_core::types::PaymentStatus;
use courier_core::Result;

/// Move the payment to `status` and copy it onto its order when it is the
/// order's latest payment.
pub fn record_status(
    payments: &dyn PaymentStore,
    orders: &dyn OrderStore,
    reference: &str,
    status: PaymentStatus,
    details: Option<serde_json::Value>,
) -> Result<Payment> {
    let mut details = details;
    let payment = payments.update(reference, &mut |p| p.transition(status, details.take()))?;
    tracing::info!(
        reference,
        order_id = %payment.order_id,
        status = %payment.status,
        "payment status recorded"
    );
    sync_order(payments, orders, &payment);
    Ok(payment)
}

/// Copy status and method of `payment` onto its order if no newer payment
/// exists for that order.
pub fn sync_order(payments: &dyn PaymentStore, orders: &dyn OrderStore, payment: &Payment) {
    let is_latest = payments
        .latest_for_order(&payment.order_id)
        .is_some_and(|latest| latest.reference == payment.reference);
    if !is_latest {
        return;
    }
    let status = payment.status;
    let method = payment.method.to_string();
    if let Err(e) = orders.update(&payment.order_id, &mut |o| {
        o.payment_status = Some(status);
        o.payment_method = Some(method.clone());
    }) {
        tracing::warn!(order_id = %payment.order_id, error = %e, "order payment status not updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_core::order::NewOrder;
    use courier_core::store::{MemoryOrderStore, MemoryPaymentStore};
    use courier_core::types::PaymentMethod;
    use courier_core::CourierError;

    fn setup() -> (MemoryOrderStore, MemoryPaymentStore, String) {
        let orders = MemoryOrderStore::new();
        let sub: NewOrder = serde_json::from_value(serde_json::json!({
            "senderName": "Jo Sm",
            "senderPhone": "1",
            "receiverName": "R",
            "receiverPhone": "2",
            "pickupAddress": "A",
            "deliveryAddress": "B",
            "itemType": "box",
            "itemSize": "s"
        }))
        .unwrap();
        let order = sub.into_order(Utc::now()).unwrap();
        let id = order.id.clone();
        orders.insert(order).unwrap();
        (orders, MemoryPaymentStore::new(), id)
    }

    fn pending(reference: &str, order_id: &str) -> Payment {
        Payment::pending(
            reference,
            order_id,
            PaymentMethod::PayPal,
            10.0,
            "USD",
            serde_json::Value::Null,
        )
    }

    #[test]
    fn status_change_reaches_order() {
        let (orders, payments, id) = setup();
        payments.insert(pending("PAY-1", &id)).unwrap();

        let p = record_status(
            &payments,
            &orders,
            "PAY-1",
            PaymentStatus::Paid,
            Some(serde_json::json!({"capture_id": "C1"})),
        )
        .unwrap();
        assert_eq!(p.details["capture_id"], "C1");

        let order = orders.get(&id).unwrap();
        assert_eq!(order.payment_status, Some(PaymentStatus::Paid));
        assert_eq!(order.payment_method.as_deref(), Some("PayPal"));
    }

    #[test]
    fn superseded_payment_does_not_overwrite_order() {
        let (orders, payments, id) = setup();
        let mut old = pending("OLD", &id);
        old.created_at = Utc::now() - chrono::Duration::minutes(5);
        payments.insert(old).unwrap();
        payments.insert(pending("NEW", &id)).unwrap();
        record_status(&payments, &orders, "NEW", PaymentStatus::Processing, None).unwrap();

        record_status(&payments, &orders, "OLD", PaymentStatus::Failed, None).unwrap();
        assert_eq!(
            orders.get(&id).unwrap().payment_status,
            Some(PaymentStatus::Processing)
        );
    }

    #[test]
    fn unknown_reference_is_payment_not_found() {
        let (orders, payments, _) = setup();
        let err = record_status(&payments, &orders, "NOPE", PaymentStatus::Paid, None).unwrap_err();
        assert!(matches!(err, CourierError::PaymentNotFound(_)));
    }
}
