//! Render and step cadences.
//!
//! Both cadences run as local tasks on one thread and share the session through
//! `Rc<RefCell<_>>`. A task borrows the session only for the synchronous extent of one render or
//! one tick, never across an `.await`, so the two can interleave but never overlap and a memory
//! lock can never be held while the other cadence runs.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::{JoinError, LocalSet};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{BridgeConfig, BridgeError, Guest, Result, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadences {
    /// Delay between one rendered frame and the next.
    pub frame_interval: Duration,
    pub tick_period: Duration,
}

impl Cadences {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            frame_interval: config.frame_interval(),
            tick_period: config.tick_period(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown token was cancelled from outside.
    Cancelled,
    /// The guest called `proc_exit`.
    Exited { code: i32 },
}

/// Drive both cadences until the session's shutdown token is cancelled.
///
/// A guest exit (from either cadence) ends the run with [`RunOutcome::Exited`]. Any other guest
/// failure stops both cadences and is returned as an error.
pub async fn run<G: Guest + 'static>(
    session: Rc<RefCell<Session<G>>>,
    cadences: Cadences,
) -> Result<RunOutcome> {
    let shutdown = session.borrow().shutdown_token();
    tracing::debug!(?cadences, "scheduler starting");

    let local = LocalSet::new();
    let render = local.spawn_local(render_cadence(
        session.clone(),
        cadences.frame_interval,
        shutdown.clone(),
    ));
    let step = local.spawn_local(step_cadence(
        session.clone(),
        cadences.tick_period,
        shutdown,
    ));
    let (render, step) = local
        .run_until(async move { (render.await, step.await) })
        .await;

    let (render, step) = (joined(render)?, joined(step)?);
    for result in [step, render] {
        match result {
            Ok(()) | Err(BridgeError::Exit { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    let exit_code = session.borrow().exit_code();
    Ok(match exit_code {
        Some(code) => {
            tracing::info!(code, "scheduler stopped: guest exited");
            RunOutcome::Exited { code }
        }
        None => {
            tracing::debug!("scheduler stopped");
            RunOutcome::Cancelled
        }
    })
}

fn joined(result: std::result::Result<Result<()>, JoinError>) -> Result<Result<()>> {
    match result {
        Ok(result) => Ok(result),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(BridgeError::Scheduler(err.to_string())),
    }
}

/// Render, wait one frame interval, repeat.
async fn render_cadence<G: Guest>(
    session: Rc<RefCell<Session<G>>>,
    frame_interval: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }
        let rendered = session.borrow_mut().render_frame();
        if let Err(err) = rendered {
            shutdown.cancel();
            return Err(err);
        }
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            _ = sleep(frame_interval) => {}
        }
    }
}

/// Fixed-period ticks; the first one fires a full period after start.
async fn step_cadence<G: Guest>(
    session: Rc<RefCell<Session<G>>>,
    tick_period: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut ticks = interval_at(Instant::now() + tick_period, tick_period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            _ = ticks.tick() => {}
        }
        let ticked = session.borrow_mut().tick();
        if let Err(err) = ticked {
            shutdown.cancel();
            return Err(err);
        }
    }
}
