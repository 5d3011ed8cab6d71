pub mod escalation;
pub mod models;
pub mod notify;
