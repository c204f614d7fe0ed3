//! Periodic refresh tasks, one per dashboard domain.
//!
//! Each domain owns a single cancellable task. Starting a domain that is
//! already running replaces its task. A tick that arrives while the previous
//! poll is still in flight is skipped.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Clock,
    Weather,
    Market,
    Feeds,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Clock => "clock",
            Domain::Weather => "weather",
            Domain::Market => "market",
            Domain::Feeds => "feeds",
        };
        f.write_str(name)
    }
}

struct DomainTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct Scheduler {
    tasks: HashMap<Domain, DomainTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `poll` now and then every `period` until stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&mut self, domain: Domain, period: Duration, poll: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop(domain);

        let period = if period.is_zero() {
            tracing::warn!("Zero refresh interval for {}; using 1s", domain);
            Duration::from_secs(1)
        } else {
            period
        };

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_domain(domain, period, poll, token.clone()));

        tracing::info!("Started {} updates every {:?}", domain, period);
        self.tasks.insert(domain, DomainTask { token, handle });
    }

    /// Cancel the domain's task. Returns `false` if it was not running.
    pub fn stop(&mut self, domain: Domain) -> bool {
        match self.tasks.remove(&domain) {
            Some(task) => {
                task.token.cancel();
                tracing::debug!("Stopped {} updates", domain);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        let domains: Vec<Domain> = self.tasks.keys().copied().collect();
        for domain in domains {
            self.stop(domain);
        }
    }

    pub fn is_running(&self, domain: Domain) -> bool {
        self.tasks
            .get(&domain)
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_domain<F, Fut>(domain: Domain, period: Duration, poll: F, token: CancellationToken)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if in_flight.swap(true, Ordering::AcqRel) {
                    tracing::debug!("Skipping {} tick; previous poll still running", domain);
                    continue;
                }

                let flag = in_flight.clone();
                let cancelled = token.clone();
                let work = poll();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancelled.cancelled() => {}
                        _ = work => {}
                    }
                    flag.store(false, Ordering::Release);
                });
            }
        }
    }
}
