use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;

use kotoba_gateway::ErrorInfo;

use crate::handlers::error_response;
use crate::state::AppState;

/// Per-client token buckets. Cheap plumbing in front of the gateway; the
/// upstream provider enforces the real quota.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_min: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            capacity: f64::from(capacity),
            refill_per_sec: f64::from(refill_per_min) / 60.0,
        }
    }

    pub fn try_acquire(&self, ip: IpAddr) -> bool {
        let mut bucket = self.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: Instant::now(),
        });
        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = Instant::now();
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);
    if !state.limiter.try_acquire(ip) {
        return error_response(&ErrorInfo::rate_limited("too many requests"));
    }
    next.run(request).await
}

fn client_ip(request: &Request) -> IpAddr {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|value| value.trim().parse().ok());
    if let Some(ip) = forwarded {
        return ip;
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
