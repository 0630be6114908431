use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::error::WebError;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Routes that carry their own request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    CreateWorkout,
    ListWorkouts,
    FetchWorkout,
    DeleteWorkout,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateWorkout => "create_workout",
            Self::ListWorkouts => "list_workouts",
            Self::FetchWorkout => "fetch_workout",
            Self::DeleteWorkout => "delete_workout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_requests: u32,
    pub window: Duration,
}

impl Budget {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Counter store consulted on every budgeted request.
///
/// Implementations must record a hit atomically with the decision so that
/// concurrent requests from one caller are never under-counted.
pub trait RateLimitStore: Send + Sync + 'static {
    fn hit(&self, caller: IpAddr, route: RouteName, budget: Budget) -> Decision;
}

#[derive(Debug)]
struct Window {
    hits: VecDeque<Instant>,
    span: Duration,
}

impl Window {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) >= self.span {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Default)]
struct Windows {
    callers: HashMap<(IpAddr, RouteName), Window>,
    /// Shared per-route window for callers seen while `callers` is full.
    overflow: HashMap<RouteName, Window>,
}

impl Windows {
    /// Drops fully expired caller windows. Returns whether a new caller fits.
    fn make_room(&mut self, max_entries: usize, now: Instant) -> bool {
        if self.callers.len() < max_entries {
            return true;
        }

        self.callers.retain(|_, window| {
            window.prune(now);
            !window.hits.is_empty()
        });
        self.callers.len() < max_entries
    }
}

/// Sliding-log limiter held in process memory.
///
/// Active windows are never evicted. Once `max_entries` callers are being
/// tracked, new callers share one overflow window per route until room frees
/// up, so the bound can only over-count.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<Windows>,
    max_entries: usize,
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryRateLimitStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            windows: Mutex::new(Windows::default()),
            max_entries: max_entries.max(1),
        }
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn hit(&self, caller: IpAddr, route: RouteName, budget: Budget) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let key = (caller, route);
        let tracked =
            windows.callers.contains_key(&key) || windows.make_room(self.max_entries, now);

        let fresh = || Window {
            hits: VecDeque::new(),
            span: budget.window,
        };
        let window = if tracked {
            windows.callers.entry(key).or_insert_with(fresh)
        } else {
            windows.overflow.entry(route).or_insert_with(fresh)
        };
        window.span = budget.window;
        window.prune(now);

        if window.hits.len() >= budget.max_requests as usize {
            let retry_after = window
                .hits
                .front()
                .map(|oldest| budget.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(budget.window);
            return Decision::Limited { retry_after };
        }

        window.hits.push_back(now);
        Decision::Allowed {
            remaining: budget.max_requests - window.hits.len() as u32,
        }
    }
}

/// Budget attached to one route.
#[derive(Clone)]
pub struct RouteLimit {
    store: Arc<dyn RateLimitStore>,
    route: RouteName,
    budget: Budget,
}

impl RouteLimit {
    pub fn new(store: Arc<dyn RateLimitStore>, route: RouteName, budget: Budget) -> Self {
        Self {
            store,
            route,
            budget,
        }
    }
}

/// Caller identity used as the rate-limit key.
fn caller_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn enforce_rate_limit(
    State(limit): State<RouteLimit>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let caller = caller_ip(&request);

    match limit.store.hit(caller, limit.route, limit.budget) {
        Decision::Allowed { remaining } => {
            tracing::trace!(caller = %caller, route = limit.route.as_str(), remaining);
            Ok(next.run(request).await)
        }
        Decision::Limited { retry_after } => {
            tracing::warn!(
                caller = %caller,
                route = limit.route.as_str(),
                "Rate limit exceeded"
            );
            Err(WebError::RateLimited { retry_after })
        }
    }
}
