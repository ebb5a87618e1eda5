//! Live runtime: a stepper task that owns the simulation and a broadcaster
//! task that periodically hands the newest snapshot to a sink.
//!
//! The stepper is the only writer. After every tick and every control command
//! it publishes an `Arc<FleetSnapshot>` on a `watch` channel, which keeps only
//! the newest value. Readers borrow the current `Arc` when they need it and
//! never hold on to a copy between invocations.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sim::{FleetSnapshot, PolicyMode, Simulation};

const COMMAND_BUFFER: usize = 32;

/// Control surface of the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Replace the simulation with a fresh generation.
    Reset,
    SetMode(PolicyMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("fleet stepper is not running")]
    Closed,
}

/// Wall-clock pacing of the two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub tick_interval: Duration,
    pub broadcast_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            broadcast_interval: Duration::from_secs(1),
        }
    }
}

/// Cheap, cloneable access to a running stepper.
#[derive(Debug, Clone)]
pub struct FleetHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<FleetSnapshot>>,
}

impl FleetHandle {
    /// Queues a command; it is applied between ticks.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Closed`] if the stepper has shut down.
    pub async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.send(Command::Stop).await
    }

    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.send(Command::Reset).await
    }

    pub async fn set_mode(&self, mode: PolicyMode) -> Result<(), RuntimeError> {
        self.send(Command::SetMode(mode)).await
    }

    /// The most recently committed snapshot.
    pub fn latest(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&*self.snapshots.borrow())
    }

    /// A receiver that is notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.snapshots.clone()
    }
}

/// Stops and awaits one background task.
///
/// Dropping the handle also stops the task.
#[derive(Debug)]
pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Requests shutdown. Safe to call more than once; the task finishes any
    /// tick in progress first.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task to exit.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
}

/// Resolves once shutdown has been requested or the handle was dropped.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Empty until the first tick of a generation has been committed.
fn publishable(sim: &Simulation, running: bool) -> Arc<FleetSnapshot> {
    if sim.tick() == 0 {
        Arc::new(FleetSnapshot::pending(sim.generation(), sim.mode(), running))
    } else {
        Arc::new(sim.snapshot(running))
    }
}

/// Spawns the stepper task, which takes ownership of `sim`.
///
/// # Arguments
///
/// * `sim` - Simulation to drive
/// * `running` - Whether ticking starts immediately
/// * `tick_interval` - Wall-clock time between ticks
///
/// # Panics
///
/// Panics if called outside a Tokio runtime or if `tick_interval` is zero.
pub fn spawn_stepper(
    mut sim: Simulation,
    running: bool,
    tick_interval: Duration,
) -> (FleetHandle, TaskHandle) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snap_tx, snap_rx) = watch::channel(publishable(&sim, running));
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut running = running;
        let mut ticker = time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            generation = sim.generation(),
            mode = %sim.mode(),
            running,
            "stepper started"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown_rx) => break,
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    apply(&mut sim, &mut running, cmd);
                    if cmd == Command::Start {
                        ticker.reset();
                    }
                    snap_tx.send_replace(publishable(&sim, running));
                }
                _ = ticker.tick(), if running => {
                    sim.step();
                    snap_tx.send_replace(Arc::new(sim.snapshot(true)));
                }
            }
        }

        info!(tick = sim.tick(), generation = sim.generation(), "stepper stopped");
    });

    (
        FleetHandle {
            commands: cmd_tx,
            snapshots: snap_rx,
        },
        TaskHandle {
            shutdown: shutdown_tx,
            join,
        },
    )
}

fn apply(sim: &mut Simulation, running: &mut bool, cmd: Command) {
    match cmd {
        Command::Start => {
            if !*running {
                info!(tick = sim.tick(), "simulation started");
            }
            *running = true;
        }
        Command::Stop => {
            if *running {
                info!(tick = sim.tick(), "simulation paused");
            }
            *running = false;
        }
        Command::Reset => {
            *sim = sim.next_generation();
            info!(generation = sim.generation(), "simulation reset");
        }
        Command::SetMode(mode) => {
            if mode != sim.mode() {
                info!(%mode, "dispatch policy switched");
            }
            sim.set_mode(mode);
        }
    }
}

/// Destination for broadcast snapshots.
pub trait SnapshotSink {
    /// Delivers one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the snapshot could not be written.
    fn publish(&mut self, snapshot: &FleetSnapshot) -> io::Result<()>;
}

/// Logs a one-line fleet summary per snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn publish(&mut self, snapshot: &FleetSnapshot) -> io::Result<()> {
        if !snapshot.is_initialized() {
            info!(generation = snapshot.generation, "fleet not yet initialized");
            return Ok(());
        }
        let m = &snapshot.metrics;
        info!(
            tick = snapshot.tick,
            clock = %snapshot.clock,
            mode = %snapshot.mode,
            grid = %m.grid.status,
            waiting = snapshot.total_waiting(),
            charging = snapshot.vehicles_charging(),
            served = m.totals.total_served,
            saving_pct = m.energy_saving_rate * 100.0,
            "fleet snapshot"
        );
        Ok(())
    }
}

/// Writes each snapshot as one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn publish(&mut self, snapshot: &FleetSnapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Spawns the broadcaster, which reads the newest snapshot every `interval`.
///
/// Each write runs on Tokio's blocking pool, so a slow sink delays only the
/// next broadcast, never the stepper.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime or if `interval` is zero.
pub fn spawn_broadcaster<S>(handle: &FleetHandle, interval: Duration, mut sink: S) -> TaskHandle
where
    S: SnapshotSink + Send + 'static,
{
    let snapshots = handle.subscribe();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = shutdown_requested(&mut shutdown_rx) => break,
                _ = ticker.tick() => {}
            }

            let snapshot = Arc::clone(&*snapshots.borrow());
            debug!(
                tick = snapshot.tick,
                generation = snapshot.generation,
                "broadcasting snapshot"
            );
            let write = task::spawn_blocking(move || {
                let result = sink.publish(&snapshot);
                (sink, result)
            });
            match write.await {
                Ok((returned, result)) => {
                    sink = returned;
                    if let Err(e) = result {
                        warn!(error = %e, "snapshot sink write failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "snapshot sink panicked, broadcaster stopping");
                    break;
                }
            }
        }
        debug!("broadcaster stopped");
    });

    TaskHandle {
        shutdown: shutdown_tx,
        join,
    }
}

/// A stepper and a broadcaster wired together.
#[derive(Debug)]
pub struct FleetRuntime {
    handle: FleetHandle,
    stepper: TaskHandle,
    broadcaster: TaskHandle,
}

impl FleetRuntime {
    /// Launches both tasks on the current Tokio runtime.
    pub fn launch<S>(sim: Simulation, config: RuntimeConfig, sink: S, running: bool) -> Self
    where
        S: SnapshotSink + Send + 'static,
    {
        let (handle, stepper) = spawn_stepper(sim, running, config.tick_interval);
        let broadcaster = spawn_broadcaster(&handle, config.broadcast_interval, sink);
        Self {
            handle,
            stepper,
            broadcaster,
        }
    }

    pub fn handle(&self) -> FleetHandle {
        self.handle.clone()
    }

    /// Stops the broadcaster, then the stepper, and waits for both.
    pub async fn shutdown(self) {
        self.broadcaster.stop();
        self.stepper.stop();
        self.broadcaster.join().await;
        self.stepper.join().await;
        info!("runtime shut down");
    }
}
