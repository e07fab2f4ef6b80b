use std::sync::Arc;

use kotoba_gateway::{ConnectionManager, RequestGateway};

use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConnectionManager>,
    pub gateway: Arc<RequestGateway>,
    pub limiter: RateLimiter,
}
