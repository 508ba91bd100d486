//! Single task that owns every pending progress step.
//!
//! Handlers talk to it through `ProgressScheduler`, a cloneable handle around
//! a command channel. Steps are ordered by due time; each order has at most
//! one pending step.

use crate::hub::SubscriptionHub;
use crate::mirror::OrderMirror;
use courier_core::order::Order;
use courier_core::progress::{self, ProgressTimings, Trigger};
use courier_core::store::{OrderStore, RiderPool};
use courier_core::CourierError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What a fired step needs to touch.
#[derive(Clone)]
pub struct ProgressContext {
    pub orders: Arc<dyn OrderStore>,
    pub riders: Arc<dyn RiderPool>,
    pub hub: SubscriptionHub,
    pub mirror: Arc<dyn OrderMirror>,
}

enum Command {
    Schedule {
        order_id: String,
    },
    Cancel {
        order_id: String,
        reply: oneshot::Sender<bool>,
    },
    Pending {
        reply: oneshot::Sender<Vec<(String, Trigger)>>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProgressScheduler {
    tx: mpsc::UnboundedSender<Command>,
}

impl ProgressScheduler {
    /// Start the scheduler task. It runs until `shutdown` or until every
    /// handle is dropped.
    pub fn spawn(ctx: ProgressContext, timings: ProgressTimings) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            ctx,
            timings,
            queue: BTreeMap::new(),
            by_order: HashMap::new(),
            seq: 0,
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }

    /// Arm the first step (rider assignment) for a freshly placed order.
    pub fn schedule(&self, order_id: &str) {
        let cmd = Command::Schedule {
            order_id: order_id.to_string(),
        };
        if self.tx.send(cmd).is_err() {
            tracing::warn!(order_id, "progress scheduler is not running");
        }
    }

    /// Drop the order's pending step. Returns whether one was pending.
    pub async fn cancel(&self, order_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::Cancel {
            order_id: order_id.to_string(),
            reply,
        };
        if self.tx.send(cmd).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Pending steps as `(order id, trigger)`, earliest first.
    pub async fn pending(&self) -> Vec<(String, Trigger)> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Pending { reply }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

type Key = (Instant, u64);

struct Step {
    order_id: String,
    trigger: Trigger,
}

struct Worker {
    ctx: ProgressContext,
    timings: ProgressTimings,
    queue: BTreeMap<Key, Step>,
    by_order: HashMap<String, Key>,
    seq: u64,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let next_due = self.queue.keys().next().map(|(at, _)| *at);
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Schedule { order_id }) => {
                        let delay = self.timings.delay_for(Trigger::AssignRider);
                        self.arm(order_id, Trigger::AssignRider, delay);
                    }
                    Some(Command::Cancel { order_id, reply }) => {
                        let _ = reply.send(self.cancel(&order_id));
                    }
                    Some(Command::Pending { reply }) => {
                        let pending = self
                            .queue
                            .values()
                            .map(|s| (s.order_id.clone(), s.trigger))
                            .collect();
                        let _ = reply.send(pending);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    self.fire_due();
                }
            }
        }
        tracing::debug!(dropped = self.queue.len(), "progress scheduler stopped");
    }

    /// Replace any pending step for the order with `trigger` after `delay`.
    fn arm(&mut self, order_id: String, trigger: Trigger, delay: Duration) {
        if let Some(old) = self.by_order.remove(&order_id) {
            self.queue.remove(&old);
        }
        let Some(due) = Instant::now().checked_add(delay) else {
            tracing::error!(order_id = %order_id, %trigger, delay_secs = delay.as_secs(), "step delay out of range, step dropped");
            return;
        };
        self.seq += 1;
        let key = (due, self.seq);
        tracing::debug!(order_id = %order_id, %trigger, delay_ms = delay.as_millis() as u64, "step armed");
        self.by_order.insert(order_id.clone(), key);
        self.queue.insert(key, Step { order_id, trigger });
    }

    fn cancel(&mut self, order_id: &str) -> bool {
        let pending = match self.by_order.remove(order_id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        };
        if !pending {
            return false;
        }
        // Only a live order still holds its rider.
        match progress::release_assigned_rider(&*self.ctx.orders, &*self.ctx.riders, order_id) {
            Ok(Some(rider_id)) => tracing::info!(order_id, rider_id, "rider released on cancel"),
            Ok(None) => {}
            Err(e) => tracing::warn!(order_id, error = %e, "cancel could not release rider"),
        }
        tracing::info!(order_id, "progress cancelled");
        true
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let step = entry.remove();
            self.by_order.remove(&step.order_id);
            self.fire(step);
        }
    }

    fn fire(&mut self, step: Step) {
        let Step { order_id, trigger } = step;
        match progress::advance(&*self.ctx.orders, &*self.ctx.riders, &order_id, trigger) {
            Ok(order) => {
                let reached = self.ctx.hub.broadcast(&order);
                tracing::info!(
                    order_id = %order_id,
                    status = %order.status,
                    subscribers = reached,
                    "order progressed"
                );
                self.mirror_status(order.clone());
                if let Some(next) = progress::next_trigger(order.status) {
                    self.arm(order_id, next, self.timings.delay_for(next));
                }
            }
            Err(CourierError::NoRiderAvailable(_)) => match self.timings.retry_unassigned {
                Some(retry) if !retry.is_zero() => {
                    tracing::warn!(order_id = %order_id, retry_ms = retry.as_millis() as u64, "no rider available, will retry");
                    self.arm(order_id, Trigger::AssignRider, retry);
                }
                _ => tracing::warn!(order_id = %order_id, "no rider available, order stays placed"),
            },
            Err(e) => tracing::warn!(order_id = %order_id, %trigger, error = %e, "progress step dropped"),
        }
    }

    fn mirror_status(&self, order: Order) {
        let mirror = Arc::clone(&self.ctx.mirror);
        tokio::spawn(async move {
            if let Err(e) = mirror.status_changed(&order).await {
                tracing::warn!(order_id = %order.id, mirror = mirror.name(), error = %e, "mirror status update failed");
            }
        });
    }
}
