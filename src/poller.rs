//! Order-status polling.
//!
//! While a session exists the poller calls `order_status()` once per tick.
//! A 403 (or a sign-out from anywhere else) ends the loop for good.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::error::Outcome;
use crate::model::SubmittedOrder;
use crate::storefront::Storefront;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Unauthenticated,
    Authenticated {
        orders: Vec<SubmittedOrder>,
        last_polled: Option<DateTime<Utc>>,
    },
}

impl PollState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, PollState::Authenticated { .. })
    }

    pub fn orders(&self) -> &[SubmittedOrder] {
        match self {
            PollState::Authenticated { orders, .. } => orders,
            PollState::Unauthenticated => &[],
        }
    }

    /// True once at least one order exists and none can change any more.
    pub fn all_settled(&self) -> bool {
        let orders = self.orders();
        !orders.is_empty() && orders.iter().all(|o| o.status.is_final())
    }
}

/// Running poller. Dropping the handle stops it.
#[derive(Debug)]
pub struct PollerHandle {
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn state(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait for the loop to end on its own (sign-out or expired session).
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub struct StatusPoller;

impl StatusPoller {
    pub fn spawn(storefront: Storefront, interval: Duration) -> PollerHandle {
        let initial = if storefront.session().is_signed_in() {
            PollState::Authenticated {
                orders: Vec::new(),
                last_polled: None,
            }
        } else {
            PollState::Unauthenticated
        };
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(run(storefront, interval, tx));
        PollerHandle {
            state: rx,
            task: Some(task),
        }
    }
}

#[instrument(skip_all, fields(interval_ms = interval.as_millis() as u64))]
async fn run(storefront: Storefront, interval: Duration, tx: watch::Sender<PollState>) {
    let mut session_rx = storefront.session().subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if session_rx.borrow_and_update().is_none() {
            info!("no active session; status polling stopped");
            tx.send_replace(PollState::Unauthenticated);
            return;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = session_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
        }

        match storefront.order_status().await {
            Outcome::Data(orders) => {
                debug!(count = orders.len(), "order status refreshed");
                tx.send_replace(PollState::Authenticated {
                    orders,
                    last_polled: Some(Utc::now()),
                });
            }
            Outcome::Empty => {
                tx.send_replace(PollState::Authenticated {
                    orders: Vec::new(),
                    last_polled: Some(Utc::now()),
                });
            }
            Outcome::Unauthorized => {
                info!("session expired; status polling stopped");
                tx.send_replace(PollState::Unauthenticated);
                return;
            }
            Outcome::Failure(reason) => {
                warn!(%reason, "order status poll failed; keeping last result");
                tx.send_modify(|state| {
                    if let PollState::Authenticated { last_polled, .. } = state {
                        *last_polled = Some(Utc::now());
                    }
                });
            }
        }
    }
}
