use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(String),

    #[error("rider not found: {0}")]
    RiderNotFound(u32),

    #[error("attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    #[error("Payment method {0} is not supported yet")]
    UnsupportedPaymentMethod(String),

    #[error("no rider available for order {0}")]
    NoRiderAvailable(String),

    #[error("order {order_id} cannot {trigger} while {status}")]
    InvalidTransition {
        order_id: String,
        status: String,
        trigger: String,
    },

    #[error("webhook rejected: {0}")]
    InvalidWebhook(String),

    #[error("webhook signature mismatch")]
    SignatureMismatch,

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("attachment storage error: {0}")]
    Storage(String),

    #[error("order mirror error: {0}")]
    Mirror(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CourierError>;
