use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    RiderAssigned,
    Pickup,
    Delivered,
}

impl OrderStatus {
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Placed,
            OrderStatus::RiderAssigned,
            OrderStatus::Pickup,
            OrderStatus::Delivered,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::RiderAssigned => "rider_assigned",
            OrderStatus::Pickup => "pickup",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Human-readable label used by external tables.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::RiderAssigned => "Rider Assigned",
            OrderStatus::Pickup => "Pickup",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Delivered
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::error::CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "rider_assigned" => Ok(OrderStatus::RiderAssigned),
            "pickup" => Ok(OrderStatus::Pickup),
            "delivered" => Ok(OrderStatus::Delivered),
            _ => Err(crate::error::CourierError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
    Abandoned,
    Processing,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::Abandoned => "Abandoned",
            PaymentStatus::Processing => "Processing",
        }
    }

    /// Whether the gateway may still move this payment.
    pub fn is_open(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = crate::error::CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Failed" => Ok(PaymentStatus::Failed),
            "Cancelled" => Ok(PaymentStatus::Cancelled),
            "Refunded" => Ok(PaymentStatus::Refunded),
            "Abandoned" => Ok(PaymentStatus::Abandoned),
            "Processing" => Ok(PaymentStatus::Processing),
            _ => Err(crate::error::CourierError::InvalidPaymentStatus(
                s.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    PayPal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::PayPal => "PayPal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::error::CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("paypal") {
            Ok(PaymentMethod::PayPal)
        } else {
            Err(crate::error::CourierError::UnsupportedPaymentMethod(
                s.to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_ordering_follows_lifecycle() {
        let all = OrderStatus::all();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Pickup.is_terminal());
    }

    #[test]
    fn order_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::RiderAssigned).unwrap();
        assert_eq!(json, "\"rider_assigned\"");
        assert_eq!(
            "rider_assigned".parse::<OrderStatus>().unwrap(),
            OrderStatus::RiderAssigned
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn payment_status_keeps_capitalized_names() {
        let json = serde_json::to_string(&PaymentStatus::Abandoned).unwrap();
        assert_eq!(json, "\"Abandoned\"");
        assert!(PaymentStatus::Processing.is_open());
        assert!(!PaymentStatus::Paid.is_open());
    }

    #[test]
    fn payment_method_parse_is_case_insensitive() {
        assert_eq!("paypal".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayPal);
        let err = "Cash".parse::<PaymentMethod>().unwrap_err();
        assert!(err.to_string().contains("Cash"));
    }
}
