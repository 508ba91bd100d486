//! Delivery progress state machine.
//!
//! Every order walks one fixed path:
//!
//! ```text
//! placed ──AssignRider──▶ rider_assigned ──PickUp──▶ pickup ──Deliver──▶ delivered
//!        (claim rider)                                        (release rider)
//! ```
//!
//! The table below is the single source of truth; the scheduler in the
//! server crate only decides *when* a trigger fires, `advance` decides what
//! it does.

use crate::error::{CourierError, Result};
use crate::order::Order;
use crate::store::{OrderStore, RiderPool};
use crate::types::OrderStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Trigger / Effect / Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    AssignRider,
    PickUp,
    Deliver,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::AssignRider => "assign_rider",
            Trigger::PickUp => "pick_up",
            Trigger::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effect applied to the rider pool when a transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ClaimRider,
    Nothing,
    ReleaseRider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub trigger: Trigger,
    pub to: OrderStatus,
    pub effect: Effect,
}

pub const TRANSITIONS: &[Transition] = &[
    Transition {
        from: OrderStatus::Placed,
        trigger: Trigger::AssignRider,
        to: OrderStatus::RiderAssigned,
        effect: Effect::ClaimRider,
    },
    Transition {
        from: OrderStatus::RiderAssigned,
        trigger: Trigger::PickUp,
        to: OrderStatus::Pickup,
        effect: Effect::Nothing,
    },
    Transition {
        from: OrderStatus::Pickup,
        trigger: Trigger::Deliver,
        to: OrderStatus::Delivered,
        effect: Effect::ReleaseRider,
    },
];

/// The transition leaving `status`, if any.
pub fn transition_from(status: OrderStatus) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == status)
}

/// The trigger that should be armed once an order reaches `status`.
pub fn next_trigger(status: OrderStatus) -> Option<Trigger> {
    transition_from(status).map(|t| t.trigger)
}

// ---------------------------------------------------------------------------
// ProgressTimings
// ---------------------------------------------------------------------------

/// How long each trigger waits after the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTimings {
    pub assign_rider: Duration,
    pub pick_up: Duration,
    pub deliver: Duration,
    /// Re-arm `AssignRider` after this delay when no rider was free.
    pub retry_unassigned: Option<Duration>,
}

impl ProgressTimings {
    pub fn delay_for(&self, trigger: Trigger) -> Duration {
        match trigger {
            Trigger::AssignRider => self.assign_rider,
            Trigger::PickUp => self.pick_up,
            Trigger::Deliver => self.deliver,
        }
    }
}

impl Default for ProgressTimings {
    fn default() -> Self {
        Self {
            assign_rider: Duration::from_secs(5),
            pick_up: Duration::from_secs(10),
            deliver: Duration::from_secs(15),
            retry_unassigned: None,
        }
    }
}

// ---------------------------------------------------------------------------
// advance
// ---------------------------------------------------------------------------

/// Fire `trigger` for the order and return the updated snapshot.
///
/// Fails with `InvalidTransition` when the order is not in the state the
/// trigger leaves from, and with `NoRiderAvailable` when the pool is empty
/// (the order is left untouched).
pub fn advance(
    orders: &dyn OrderStore,
    riders: &dyn RiderPool,
    order_id: &str,
    trigger: Trigger,
) -> Result<Order> {
    let order = orders
        .get(order_id)
        .ok_or_else(|| CourierError::OrderNotFound(order_id.to_string()))?;

    let transition = transition_from(order.status)
        .filter(|t| t.trigger == trigger)
        .ok_or_else(|| CourierError::InvalidTransition {
            order_id: order_id.to_string(),
            status: order.status.to_string(),
            trigger: trigger.to_string(),
        })?;
    let to = transition.to;

    match transition.effect {
        Effect::ClaimRider => {
            let rider = riders
                .claim_first_available()
                .ok_or_else(|| CourierError::NoRiderAvailable(order_id.to_string()))?;
            let rider_id = rider.id;
            let mut slot = Some(rider);
            let updated = orders.update(order_id, &mut |o| {
                o.rider = slot.take();
                o.status = to;
            });
            if updated.is_err() {
                let _ = riders.release(rider_id);
            }
            updated
        }
        Effect::Nothing => orders.update(order_id, &mut |o| o.status = to),
        Effect::ReleaseRider => {
            let released = match order.rider_id() {
                Some(id) => Some(riders.release(id)?),
                None => None,
            };
            orders.update(order_id, &mut |o| {
                o.status = to;
                if let (Some(r), Some(rel)) = (o.rider.as_mut(), released.as_ref()) {
                    r.available = rel.available;
                }
            })
        }
    }
}

/// Return the order's rider to the pool unless the delivery already did.
///
/// Used when progress is cancelled part-way.
pub fn release_assigned_rider(
    orders: &dyn OrderStore,
    riders: &dyn RiderPool,
    order_id: &str,
) -> Result<Option<u32>> {
    let Some(order) = orders.get(order_id) else {
        return Err(CourierError::OrderNotFound(order_id.to_string()));
    };
    if order.status.is_terminal() {
        return Ok(None);
    }
    match order.rider_id() {
        Some(id) => {
            riders.release(id)?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}
