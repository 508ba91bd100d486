use crate::error::{CourierError, Result};
use crate::rider::Rider;
use crate::types::{OrderStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Fields a submission must carry, in the order they are reported back.
pub const REQUIRED_FIELDS: &[&str] = &[
    "senderName",
    "senderPhone",
    "receiverName",
    "receiverPhone",
    "pickupAddress",
    "deliveryAddress",
    "itemType",
    "itemSize",
];

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub sender_name: String,
    pub sender_phone: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub item_type: String,
    pub item_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// `None` until a payment is initialized for the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub rider: Option<Rider>,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Record id in the external mirror, when one accepted the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn rider_id(&self) -> Option<u32> {
        self.rider.as_ref().map(|r| r.id)
    }
}

// ---------------------------------------------------------------------------
// NewOrder: an order submission as posted by the form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_phone: Option<String>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub receiver_phone: Option<String>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub item_size: Option<String>,
    #[serde(default)]
    pub item_weight: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub estimated_time: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl NewOrder {
    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<String> {
        let values = [
            &self.sender_name,
            &self.sender_phone,
            &self.receiver_name,
            &self.receiver_phone,
            &self.pickup_address,
            &self.delivery_address,
            &self.item_type,
            &self.item_size,
        ];
        REQUIRED_FIELDS
            .iter()
            .zip(values)
            .filter(|(_, v)| v.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Validate the submission and build a `placed` order stamped at `now`.
    pub fn into_order(self, now: DateTime<Utc>) -> Result<Order> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(CourierError::MissingFields(missing));
        }

        let sender_name = required(self.sender_name);
        let id = generate_order_id(&sender_name, now, &mut rand::thread_rng());

        Ok(Order {
            id,
            status: OrderStatus::Placed,
            sender_name,
            sender_phone: required(self.sender_phone),
            receiver_name: required(self.receiver_name),
            receiver_phone: required(self.receiver_phone),
            pickup_address: required(self.pickup_address),
            delivery_address: required(self.delivery_address),
            item_type: required(self.item_type),
            item_size: required(self.item_size),
            item_weight: optional(self.item_weight),
            special_requirements: optional(self.special_requirements),
            distance: self.distance,
            estimated_time: self.estimated_time,
            price: self.price,
            payment_status: None,
            payment_method: optional(self.payment_method),
            rider: None,
            attachments: self.attachments,
            external_ref: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn required(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn optional(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Order id generation
// ---------------------------------------------------------------------------

/// Uppercase first letters of up to three words of `name`, or `XX`.
pub fn sender_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().find(|c| c.is_alphanumeric()))
        .take(3)
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "XX".to_string()
    } else {
        initials
    }
}

/// Build `INITIALS-<unix millis>-<4 random base36 chars>`.
pub fn generate_order_id<R: Rng + ?Sized>(
    sender_name: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> String {
    let suffix: String = (0..4)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        sender_initials(sender_name),
        now.timestamp_millis(),
        suffix
    )
}

// ---------------------------------------------------------------------------
// Lenient numeric fields
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(d: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrText> = Option::deserialize(d)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

fn lenient_u32<'de, D>(d: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(d)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn complete() -> NewOrder {
        serde_json::from_value(serde_json::json!({
            "senderName": "John Smith",
            "senderPhone": "555-0100",
            "receiverName": "Mary Major",
            "receiverPhone": "555-0199",
            "pickupAddress": "1 Main St",
            "deliveryAddress": "9 Elm St",
            "itemType": "documents",
            "itemSize": "small",
            "distance": "4.2",
            "estimatedTime": 18,
            "price": 12.5
        }))
        .unwrap()
    }

    #[test]
    fn complete_submission_becomes_placed_order() {
        let order = complete().into_order(Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.distance, Some(4.2));
        assert_eq!(order.estimated_time, Some(18));
        assert!(order.id.starts_with("JS-"));
        assert!(order.rider.is_none());
        assert!(order.payment_status.is_none());
    }

    #[test]
    fn payment_status_is_omitted_until_a_payment_exists() {
        let mut order = complete().into_order(Utc::now()).unwrap();
        let wire = serde_json::to_value(&order).unwrap();
        assert!(wire.get("paymentStatus").is_none());

        order.payment_status = Some(PaymentStatus::Pending);
        let wire = serde_json::to_value(&order).unwrap();
        assert_eq!(wire["paymentStatus"], PaymentStatus::Pending.as_str());
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let mut sub = complete();
        sub.receiver_phone = Some("   ".into());
        sub.item_size = None;
        assert_eq!(sub.missing_fields(), vec!["receiverPhone", "itemSize"]);

        let err = sub.into_order(Utc::now()).unwrap_err();
        assert!(matches!(err, CourierError::MissingFields(ref f) if f.len() == 2));
    }

    #[test]
    fn empty_submission_reports_all_required_fields() {
        let missing = NewOrder::default().missing_fields();
        assert_eq!(missing.len(), REQUIRED_FIELDS.len());
    }

    #[test]
    fn initials_take_up_to_three_words() {
        assert_eq!(sender_initials("john smith"), "JS");
        assert_eq!(sender_initials("Ana María de la Cruz"), "AMD");
        assert_eq!(sender_initials("   "), "XX");
    }

    #[test]
    fn order_id_embeds_timestamp_and_suffix() {
        let now = DateTime::parse_from_rfc3339("2024-06-10T06:13:20Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_order_id("Jane Doe", now, &mut rng);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts[0], "JD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].bytes().all(|b| SUFFIX_ALPHABET.contains(&b)));
    }

    #[test]
    fn unparsable_numeric_text_is_dropped() {
        let sub: NewOrder = serde_json::from_value(serde_json::json!({ "price": "free" })).unwrap();
        assert_eq!(sub.price, None);
    }
}
