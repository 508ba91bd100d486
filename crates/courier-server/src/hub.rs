//! WebSocket subscription registry and order-update fan-out.

use courier_core::order::Order;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

pub type ConnectionId = u64;

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    SubscribeToOrder {
        #[serde(rename = "orderId")]
        order_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    OrderUpdate { order: Order },
}

// ---------------------------------------------------------------------------
// SubscriptionHub
// ---------------------------------------------------------------------------

struct Connection {
    order_id: Option<String>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Default)]
struct HubInner {
    next_id: ConnectionId,
    connections: HashMap<ConnectionId, Connection>,
}

/// Connection id → subscribed order, plus the outbound channel of each
/// connection. Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    inner: Arc<RwLock<HubInner>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HubInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HubInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a connection with no subscription yet.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.connections.insert(id, Connection { order_id: None, tx });
        (id, rx)
    }

    /// Point the connection at `order_id`, replacing any earlier subscription.
    /// Returns false when the connection is gone.
    pub fn subscribe(&self, conn: ConnectionId, order_id: &str) -> bool {
        match self.write().connections.get_mut(&conn) {
            Some(c) => {
                c.order_id = Some(order_id.to_string());
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, conn: ConnectionId) {
        self.write().connections.remove(&conn);
    }

    /// Send one message to a single connection.
    pub fn send_to(&self, conn: ConnectionId, msg: ServerMessage) -> bool {
        self.read()
            .connections
            .get(&conn)
            .map(|c| c.tx.send(msg).is_ok())
            .unwrap_or(false)
    }

    /// Push the order snapshot to every connection subscribed to it and
    /// return how many were reached. Closed receivers are skipped.
    pub fn broadcast(&self, order: &Order) -> usize {
        let inner = self.read();
        inner
            .connections
            .values()
            .filter(|c| c.order_id.as_deref() == Some(order.id.as_str()))
            .filter(|c| {
                c.tx
                    .send(ServerMessage::OrderUpdate {
                        order: order.clone(),
                    })
                    .is_ok()
            })
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    pub fn subscriber_count(&self, order_id: &str) -> usize {
        self.read()
            .connections
            .values()
            .filter(|c| c.order_id.as_deref() == Some(order_id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_core::order::NewOrder;

    fn order(sender: &str) -> Order {
        let sub: NewOrder = serde_json::from_value(serde_json::json!({
            "senderName": sender,
            "senderPhone": "1",
            "receiverName": "R",
            "receiverPhone": "2",
            "pickupAddress": "A",
            "deliveryAddress": "B",
            "itemType": "box",
            "itemSize": "s"
        }))
        .unwrap();
        sub.into_order(Utc::now()).unwrap()
    }

    #[test]
    fn client_message_parses_subscribe() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe-to-order","orderId":"JS-1-AAAA"}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubscribeToOrder {
                order_id: "JS-1-AAAA".into()
            }
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).is_err());
    }

    #[test]
    fn server_message_is_tagged_order_update() {
        let o = order("Jo Sm");
        let v = serde_json::to_value(ServerMessage::OrderUpdate { order: o.clone() }).unwrap();
        assert_eq!(v["type"], "order-update");
        assert_eq!(v["order"]["id"], o.id);
        assert_eq!(v["order"]["status"], "placed");
    }

    #[test]
    fn broadcast_reaches_only_matching_subscribers() {
        let hub = SubscriptionHub::new();
        let a = order("A A");
        let b = order("B B");
        let (c1, mut rx1) = hub.register();
        let (c2, mut rx2) = hub.register();
        let (_c3, mut rx3) = hub.register();
        hub.subscribe(c1, &a.id);
        hub.subscribe(c2, &b.id);

        assert_eq!(hub.broadcast(&a), 1);
        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::OrderUpdate { order }) if order.id == a.id));
        assert!(rx2.try_recv().is_err());
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn resubscribe_replaces_previous_interest() {
        let hub = SubscriptionHub::new();
        let a = order("A A");
        let b = order("B B");
        let (c, mut rx) = hub.register();
        hub.subscribe(c, &a.id);
        hub.subscribe(c, &b.id);

        assert_eq!(hub.broadcast(&a), 0);
        assert_eq!(hub.broadcast(&b), 1);
        assert!(rx.try_recv().is_ok());
        assert_eq!(hub.subscriber_count(&a.id), 0);
    }

    #[test]
    fn unregister_and_closed_receivers_are_skipped() {
        let hub = SubscriptionHub::new();
        let a = order("A A");
        let (c1, rx1) = hub.register();
        let (c2, _rx2) = hub.register();
        hub.subscribe(c1, &a.id);
        hub.subscribe(c2, &a.id);
        drop(rx1);

        assert_eq!(hub.broadcast(&a), 1);
        hub.unregister(c2);
        assert_eq!(hub.broadcast(&a), 0);
        assert_eq!(hub.connection_count(), 1);
        assert!(!hub.subscribe(c2, &a.id));
    }
}
