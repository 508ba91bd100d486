//! Store abstractions for orders, riders and payments.
//!
//! Handlers and the progress scheduler only see the traits, so a database
//! backed implementation can replace the in-memory ones without touching
//! them. Implementations lock internally; callers never hold a guard.

use crate::error::{CourierError, Result};
use crate::order::Order;
use crate::payment::Payment;
use crate::rider::Rider;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait OrderStore: Send + Sync {
    fn insert(&self, order: Order) -> Result<()>;

    fn get(&self, id: &str) -> Option<Order>;

    /// Apply `f` to the stored order and return the updated snapshot.
    fn update(&self, id: &str, f: &mut dyn FnMut(&mut Order)) -> Result<Order>;
}

pub trait RiderPool: Send + Sync {
    /// Mark the first available rider (in seed order) unavailable and return it.
    fn claim_first_available(&self) -> Option<Rider>;

    /// Make a rider available again.
    fn release(&self, id: u32) -> Result<Rider>;

    fn list(&self) -> Vec<Rider>;
}

pub trait PaymentStore: Send + Sync {
    fn insert(&self, payment: Payment) -> Result<()>;

    fn get(&self, reference: &str) -> Option<Payment>;

    fn update(&self, reference: &str, f: &mut dyn FnMut(&mut Payment)) -> Result<Payment>;

    /// Payments for an order, newest first.
    fn for_order(&self, order_id: &str) -> Vec<Payment>;

    fn latest_for_order(&self, order_id: &str) -> Option<Payment> {
        self.for_order(order_id).into_iter().next()
    }

    /// Flag every pending payment older than `threshold` as abandoned and
    /// return the flagged records.
    fn sweep_abandoned(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<Payment>;
}

// ---------------------------------------------------------------------------
// Lock helpers
// ---------------------------------------------------------------------------

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// MemoryOrderStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, order: Order) -> Result<()> {
        let mut orders = write(&self.orders);
        if orders.iter().any(|o| o.id == order.id) {
            return Err(CourierError::InvalidRequest(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        orders.push(order);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<Order> {
        read(&self.orders).iter().find(|o| o.id == id).cloned()
    }

    fn update(&self, id: &str, f: &mut dyn FnMut(&mut Order)) -> Result<Order> {
        let mut orders = write(&self.orders);
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| CourierError::OrderNotFound(id.to_string()))?;
        f(order);
        order.touch();
        Ok(order.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryRiderPool
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MemoryRiderPool {
    riders: Mutex<Vec<Rider>>,
}

impl MemoryRiderPool {
    pub fn new(riders: Vec<Rider>) -> Self {
        Self {
            riders: Mutex::new(riders),
        }
    }
}

impl RiderPool for MemoryRiderPool {
    fn claim_first_available(&self) -> Option<Rider> {
        let mut riders = lock(&self.riders);
        let rider = riders.iter_mut().find(|r| r.available)?;
        rider.available = false;
        Some(rider.clone())
    }

    fn release(&self, id: u32) -> Result<Rider> {
        let mut riders = lock(&self.riders);
        let rider = riders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(CourierError::RiderNotFound(id))?;
        rider.available = true;
        Ok(rider.clone())
    }

    fn list(&self) -> Vec<Rider> {
        lock(&self.riders).clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryPaymentStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPaymentStore {
    payments: RwLock<Vec<Payment>>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentStore for MemoryPaymentStore {
    fn insert(&self, payment: Payment) -> Result<()> {
        let mut payments = write(&self.payments);
        if payments.iter().any(|p| p.reference == payment.reference) {
            return Err(CourierError::InvalidRequest(format!(
                "duplicate payment reference {}",
                payment.reference
            )));
        }
        payments.push(payment);
        Ok(())
    }

    fn get(&self, reference: &str) -> Option<Payment> {
        read(&self.payments)
            .iter()
            .find(|p| p.reference == reference)
            .cloned()
    }

    fn update(&self, reference: &str, f: &mut dyn FnMut(&mut Payment)) -> Result<Payment> {
        let mut payments = write(&self.payments);
        let payment = payments
            .iter_mut()
            .find(|p| p.reference == reference)
            .ok_or_else(|| CourierError::PaymentNotFound(reference.to_string()))?;
        f(payment);
        Ok(payment.clone())
    }

    fn for_order(&self, order_id: &str) -> Vec<Payment> {
        let mut list: Vec<Payment> = read(&self.payments)
            .iter()
            .rev()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        // stable: equal timestamps keep the most recently inserted first
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    fn sweep_abandoned(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<Payment> {
        let mut payments = write(&self.payments);
        payments
            .iter_mut()
            .filter(|p| p.is_abandoned_at(now, threshold))
            .map(|p| {
                p.mark_abandoned(now);
                p.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewOrder;
    use crate::rider::default_riders;
    use crate::types::{OrderStatus, PaymentMethod, PaymentStatus};

    fn order() -> Order {
        let sub: NewOrder = serde_json::from_value(serde_json::json!({
            "senderName": "Sam Lee",
            "senderPhone": "1",
            "receiverName": "Kim",
            "receiverPhone": "2",
            "pickupAddress": "A",
            "deliveryAddress": "B",
            "itemType": "box",
            "itemSize": "m"
        }))
        .unwrap();
        sub.into_order(Utc::now()).unwrap()
    }

    #[test]
    fn order_store_round_trip_and_update() {
        let store = MemoryOrderStore::new();
        let o = order();
        let id = o.id.clone();
        store.insert(o.clone()).unwrap();
        assert!(store.insert(o).is_err());

        let updated = store
            .update(&id, &mut |o| o.status = OrderStatus::Pickup)
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Pickup);
        assert_eq!(store.get(&id).unwrap().status, OrderStatus::Pickup);
        assert!(matches!(
            store.update("nope", &mut |_| {}),
            Err(CourierError::OrderNotFound(_))
        ));
    }

    #[test]
    fn rider_pool_claims_first_available_then_releases() {
        let pool = MemoryRiderPool::new(default_riders());
        assert_eq!(pool.claim_first_available().unwrap().id, 1);
        assert_eq!(pool.claim_first_available().unwrap().id, 2);

        pool.release(1).unwrap();
        assert_eq!(pool.claim_first_available().unwrap().id, 1);
        assert_eq!(pool.claim_first_available().unwrap().id, 3);
        assert!(pool.claim_first_available().is_none());
        assert!(matches!(pool.release(42), Err(CourierError::RiderNotFound(42))));
    }

    #[test]
    fn payments_for_order_are_newest_first() {
        let store = MemoryPaymentStore::new();
        let mut old = Payment::pending("A", "o1", PaymentMethod::PayPal, 1.0, "USD", serde_json::Value::Null);
        old.created_at = Utc::now() - Duration::minutes(5);
        let new = Payment::pending("B", "o1", PaymentMethod::PayPal, 2.0, "USD", serde_json::Value::Null);
        let other = Payment::pending("C", "o2", PaymentMethod::PayPal, 3.0, "USD", serde_json::Value::Null);
        store.insert(old).unwrap();
        store.insert(new).unwrap();
        store.insert(other).unwrap();

        let refs: Vec<String> = store.for_order("o1").into_iter().map(|p| p.reference).collect();
        assert_eq!(refs, vec!["B", "A"]);
        assert_eq!(store.latest_for_order("o1").unwrap().reference, "B");
        assert!(store.latest_for_order("o3").is_none());
    }

    #[test]
    fn sweep_flags_only_stale_pending_payments() {
        let store = MemoryPaymentStore::new();
        let now = Utc::now();
        let mut stale = Payment::pending("S", "o1", PaymentMethod::PayPal, 1.0, "USD", serde_json::Value::Null);
        stale.created_at = now - Duration::minutes(45);
        let fresh = Payment::pending("F", "o1", PaymentMethod::PayPal, 1.0, "USD", serde_json::Value::Null);
        let mut paid = Payment::pending("P", "o1", PaymentMethod::PayPal, 1.0, "USD", serde_json::Value::Null);
        paid.created_at = now - Duration::minutes(45);
        paid.status = PaymentStatus::Paid;
        store.insert(stale).unwrap();
        store.insert(fresh).unwrap();
        store.insert(paid).unwrap();

        let flagged = store.sweep_abandoned(now, Duration::minutes(30));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].reference, "S");
        assert_eq!(store.get("S").unwrap().status, PaymentStatus::Abandoned);
        assert_eq!(store.get("F").unwrap().status, PaymentStatus::Pending);
        assert!(store.sweep_abandoned(now, Duration::minutes(30)).is_empty());
    }
}
