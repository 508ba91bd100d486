pub mod orders;
pub mod payments;
pub mod riders;
pub mod uploads;
pub mod webhooks;
pub mod ws;
