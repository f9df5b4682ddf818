//! Long-running trigger scheduler.
//!
//! Re-reads the registry every cycle, sleeps until the earliest next fire
//! time (in local time), then invokes every handler due at that instant.
//! Handler failures are logged and never stop the loop.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, error, info, warn};

use stockwatch_core::{Clock, Handler, SystemClock, Trigger, TriggerRegistry};

/// Runs the procedure behind a trigger handler.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, handler: Handler) -> anyhow::Result<()>;
}

/// Earliest upcoming fire time and the handlers due at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Due<Tz: TimeZone> {
    pub at: DateTime<Tz>,
    pub handlers: Vec<Handler>,
}

/// Next fire time across all triggers, strictly after `now`.
pub fn next_due<Tz: TimeZone>(triggers: &[Trigger], now: &DateTime<Tz>) -> Option<Due<Tz>> {
    let mut due: Option<Due<Tz>> = None;

    for trigger in triggers {
        let Some(at) = trigger.schedule.next_fire_after(now) else {
            continue;
        };
        let earlier = due.as_ref().is_none_or(|current| at < current.at);
        if earlier {
            due = Some(Due {
                at,
                handlers: vec![trigger.handler],
            });
        } else if let Some(current) = due.as_mut() {
            if current.at == at && !current.handlers.contains(&trigger.handler) {
                current.handlers.push(trigger.handler);
            }
        }
    }

    due
}

/// Scheduler loop settings.
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Upper bound on one sleep, so registry edits and clock changes are
    /// picked up without a restart.
    pub max_sleep: Duration,
    /// Wait between polls while no trigger is registered.
    pub idle_poll: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            max_sleep: Duration::from_secs(15 * 60),
            idle_poll: Duration::from_secs(60),
        }
    }
}

/// Handle for the running scheduler thread.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for the thread (an in-flight handler finishes first).
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Block until the scheduler thread exits.
    pub fn join(mut self) {
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Scheduler {
    pub fn spawn<R, D>(&self, registry: Arc<R>, dispatch: Arc<D>) -> std::io::Result<SchedulerHandle>
    where
        R: TriggerRegistry + ?Sized + 'static,
        D: Dispatch + ?Sized,
    {
        self.spawn_with_clock(registry, dispatch, Arc::new(SystemClock))
    }

    /// Like [`Scheduler::spawn`], reading the current time from `clock`.
    pub fn spawn_with_clock<R, D, C>(
        &self,
        registry: Arc<R>,
        dispatch: Arc<D>,
        clock: Arc<C>,
    ) -> std::io::Result<SchedulerHandle>
    where
        R: TriggerRegistry + ?Sized + 'static,
        D: Dispatch + ?Sized,
        C: Clock + ?Sized + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let cfg = self.clone();
        let join = thread::Builder::new()
            .name("stockwatch-scheduler".to_string())
            .spawn(move || scheduler_loop(cfg, shutdown_rx, registry, dispatch, clock))?;

        Ok(SchedulerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    /// Run on a dedicated thread and block until it stops.
    pub fn run_forever<R, D>(&self, registry: Arc<R>, dispatch: Arc<D>) -> std::io::Result<()>
    where
        R: TriggerRegistry + ?Sized + 'static,
        D: Dispatch + ?Sized,
    {
        self.spawn(registry, dispatch)?.join();
        Ok(())
    }
}

/// Sleep up to `timeout`; `true` means shutdown was requested.
fn wait_for_shutdown(rx: &mpsc::Receiver<()>, timeout: Duration) -> bool {
    !matches!(rx.recv_timeout(timeout), Err(mpsc::RecvTimeoutError::Timeout))
}

fn scheduler_loop<R, D, C>(
    cfg: Scheduler,
    shutdown_rx: mpsc::Receiver<()>,
    registry: Arc<R>,
    dispatch: Arc<D>,
    clock: Arc<C>,
) where
    R: TriggerRegistry + ?Sized,
    D: Dispatch + ?Sized,
    C: Clock + ?Sized,
{
    info!("scheduler started");

    loop {
        let triggers = match registry.list() {
            Ok(triggers) => triggers,
            Err(e) => {
                warn!(error = %e, "failed to read triggers");
                if wait_for_shutdown(&shutdown_rx, cfg.idle_poll) {
                    break;
                }
                continue;
            }
        };

        let now = clock.now().with_timezone(&Local);
        let Some(due) = next_due(&triggers, &now) else {
            debug!("no triggers registered");
            if wait_for_shutdown(&shutdown_rx, cfg.idle_poll) {
                break;
            }
            continue;
        };

        let until = (due.at.clone() - now).to_std().unwrap_or(Duration::ZERO);
        if until > cfg.max_sleep {
            debug!(next = %due.at, "next trigger beyond sleep window");
            if wait_for_shutdown(&shutdown_rx, cfg.max_sleep) {
                break;
            }
            continue;
        }

        if wait_for_shutdown(&shutdown_rx, until) {
            break;
        }
        for handler in due.handlers {
            info!(handler = %handler, "trigger fired");
            match dispatch.dispatch(handler) {
                Ok(()) => info!(handler = %handler, "handler finished"),
                Err(e) => error!(handler = %handler, error = %format!("{e:#}"), "handler failed"),
            }
        }
    }

    info!("scheduler stopped");
}
