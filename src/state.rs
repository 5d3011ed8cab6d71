use crate::db::CrisisStore;
use crate::domain::escalation::EscalationService;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub escalations: EscalationService,
    pub session_key: Vec<u8>,
}

impl AppState {
    pub fn new(store: Arc<dyn CrisisStore>, store_timeout: Duration, session_key: Vec<u8>) -> Self {
        Self {
            escalations: EscalationService::new(store, store_timeout),
            session_key,
        }
    }
}

pub type SharedState = Arc<AppState>;
