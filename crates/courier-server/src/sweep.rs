use crate::ledger;
use chrono::{DateTime, Utc};
use courier_core::payment::Payment;
use courier_core::store::{OrderStore, PaymentStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Flag stale pending payments as abandoned and mirror the change onto their
/// orders. Returns the flagged payments.
pub fn sweep_once(
    payments: &dyn PaymentStore,
    orders: &dyn OrderStore,
    now: DateTime<Utc>,
    threshold: chrono::Duration,
) -> Vec<Payment> {
    let flagged = payments.sweep_abandoned(now, threshold);
    for p in &flagged {
        tracing::info!(reference = %p.reference, order_id = %p.order_id, "payment abandoned");
        ledger::sync_order(payments, orders, p);
    }
    flagged
}

/// Run `sweep_once` right away and then every `every`.
pub fn spawn_abandonment_sweep(
    payments: Arc<dyn PaymentStore>,
    orders: Arc<dyn OrderStore>,
    every: Duration,
    threshold: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let flagged = sweep_once(&*payments, &*orders, Utc::now(), threshold);
            if !flagged.is_empty() {
                tracing::info!(count = flagged.len(), "abandonment sweep flagged payments");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::order::NewOrder;
    use courier_core::store::{MemoryOrderStore, MemoryPaymentStore};
    use courier_core::types::{PaymentMethod, PaymentStatus};

    fn place(orders: &MemoryOrderStore) -> String {
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
        let mut order = sub.into_order(Utc::now()).unwrap();
        order.payment_status = Some(PaymentStatus::Pending);
        let id = order.id.clone();
        orders.insert(order).unwrap();
        id
    }

    fn pending_at(reference: &str, order_id: &str, created_at: DateTime<Utc>) -> Payment {
        let mut p = Payment::pending(
            reference,
            order_id,
            PaymentMethod::PayPal,
            5.0,
            "USD",
            serde_json::json!({"gateway": "mock"}),
        );
        p.created_at = created_at;
        p
    }

    #[test]
    fn stale_payment_is_abandoned_and_order_follows() {
        let orders = MemoryOrderStore::new();
        let payments = MemoryPaymentStore::new();
        let id = place(&orders);
        let now = Utc::now();
        payments
            .insert(pending_at("OLD", &id, now - chrono::Duration::minutes(31)))
            .unwrap();

        let flagged = sweep_once(&payments, &orders, now, chrono::Duration::minutes(30));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].details["gateway"], "mock");
        assert!(flagged[0].details["abandoned_at"].is_string());
        assert_eq!(
            orders.get(&id).unwrap().payment_status,
            Some(PaymentStatus::Abandoned)
        );
    }

    #[test]
    fn payment_exactly_at_threshold_is_kept() {
        let orders = MemoryOrderStore::new();
        let payments = MemoryPaymentStore::new();
        let id = place(&orders);
        let now = Utc::now();
        payments
            .insert(pending_at("EDGE", &id, now - chrono::Duration::minutes(30)))
            .unwrap();

        assert!(sweep_once(&payments, &orders, now, chrono::Duration::minutes(30)).is_empty());
        assert_eq!(payments.get("EDGE").unwrap().status, PaymentStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_runs_at_startup() {
        let orders = Arc::new(MemoryOrderStore::new());
        let payments = Arc::new(MemoryPaymentStore::new());
        let id = place(&orders);
        payments
            .insert(pending_at(
                "OLD",
                &id,
                Utc::now() - chrono::Duration::hours(2),
            ))
            .unwrap();

        let task = spawn_abandonment_sweep(
            payments.clone(),
            orders.clone(),
            Duration::from_secs(15 * 60),
            chrono::Duration::minutes(30),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(payments.get("OLD").unwrap().status, PaymentStatus::Abandoned);
        task.abort();
    }
}
