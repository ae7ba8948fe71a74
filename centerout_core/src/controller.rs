//! The controller: one thread that owns the trial machine, cursor filter,
//! parameter store, observer hub and reward dispenser.
//!
//! Every input (cursor samples, commands, reloads, observer registration,
//! timeouts) arrives through a single unbounded queue, so triggers are
//! processed strictly one at a time and enqueueing never blocks the caller.
//!
//! Lifecycle: construct (`Controller::new` / `Controller::load`) -> run on a
//! thread (`spawn`) -> `ControllerHandle::shutdown`, which joins it.

use crate::cursor::Cursor;
use crate::error::CoreError;
use crate::event::{CursorSnapshot, Event, ParamsSnapshot, Snapshot};
use crate::geometry::Point;
use crate::hub::{BroadcastHub, ObserverId};
use crate::machine::{Block, Direction, Effect, Machine, Transition, TrialCounters, TrialState, Trigger};
use crate::sequencer::TargetSequencer;
use crate::store::ParameterStore;
use crate::timer::DeadlineTimer;
use centerout_config::{Config, ParamTable};
use centerout_traits::clock::MonotonicClock;
use centerout_traits::{Observer, RewardDispenser};
use crossbeam_channel as xch;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reads named parameter and target sources.
pub trait SourceLoader {
    fn load_params(&self, source: &str) -> Result<ParamTable, CoreError>;
    fn load_targets(&self, source: &str) -> Result<Vec<usize>, CoreError>;
}

/// Sources are file paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSources;

impl SourceLoader for FsSources {
    fn load_params(&self, source: &str) -> Result<ParamTable, CoreError> {
        centerout_config::load_params(Path::new(source))
            .map_err(|e| CoreError::Source(e.to_string()))
    }

    fn load_targets(&self, source: &str) -> Result<Vec<usize>, CoreError> {
        centerout_config::load_targets(Path::new(source))
            .map_err(|e| CoreError::Source(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Params,
    Targets,
}

pub type Reply<T> = xch::Sender<Result<T, CoreError>>;

/// Everything the controller thread consumes.
pub enum Input {
    Event(Event),
    Timeout {
        state: TrialState,
        generation: u64,
    },
    Register {
        id: ObserverId,
        observer: Box<dyn Observer>,
    },
    Unregister(ObserverId),
    Reload {
        kind: SourceKind,
        source: String,
        reply: Option<Reply<()>>,
    },
    Status(xch::Sender<Status>),
    Shutdown,
}

impl core::fmt::Debug for Input {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Input::Event(e) => f.debug_tuple("Event").field(e).finish(),
            Input::Timeout { state, generation } => f
                .debug_struct("Timeout")
                .field("state", state)
                .field("generation", generation)
                .finish(),
            Input::Register { id, .. } => f.debug_struct("Register").field("id", id).finish(),
            Input::Unregister(id) => f.debug_tuple("Unregister").field(id).finish(),
            Input::Reload { kind, source, .. } => f
                .debug_struct("Reload")
                .field("kind", kind)
                .field("source", source)
                .finish(),
            Input::Status(_) => f.write_str("Status"),
            Input::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub state: TrialState,
    pub generation: u64,
    pub counters: TrialCounters,
    pub direction: Direction,
    pub target: usize,
    pub block: Block,
    pub cursor: Point,
    pub observers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub width: f64,
    pub height: f64,
    /// Spread constant K for randomized holds.
    pub hold_spread: f64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            hold_spread: 5.0,
            seed: None,
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            width: f64::from(cfg.canvas.width),
            height: f64::from(cfg.canvas.height),
            hold_spread: cfg.timing.hold_spread,
            seed: None,
        }
    }
}

pub struct Controller<D: RewardDispenser, L: SourceLoader> {
    machine: Machine<StdRng>,
    store: ParameterStore,
    cursor: Cursor,
    hub: BroadcastHub,
    dispenser: D,
    loader: L,
    timer: DeadlineTimer,
    tx: xch::Sender<Input>,
    rx: xch::Receiver<Input>,
    ids: Arc<AtomicU64>,
}

impl<D: RewardDispenser, L: SourceLoader> core::fmt::Debug for Controller<D, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("machine", &self.machine)
            .field("hub", &self.hub)
            .finish()
    }
}

impl<D, L> Controller<D, L>
where
    D: RewardDispenser,
    L: SourceLoader,
{
    /// Build a controller from an already-loaded table and sequence. The
    /// machine starts in `Idle`.
    pub fn new(
        settings: ControllerSettings,
        table: &ParamTable,
        sequencer: TargetSequencer,
        dispenser: D,
        loader: L,
    ) -> Result<Self, CoreError> {
        let center = Point::new(settings.width / 2.0, settings.height / 2.0);
        let store = ParameterStore::from_table(table, center)?;
        store.check_sequence(sequencer.indices())?;

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (tx, rx) = xch::unbounded();
        let timer = DeadlineTimer::spawn(tx.clone(), MonotonicClock::new());

        tracing::info!(
            subject = %store.params().subject,
            n_targets = store.params().n_targets,
            sequence_len = sequencer.indices().len(),
            "controller constructed"
        );

        Ok(Self {
            machine: Machine::new(sequencer, settings.hold_spread, rng),
            store,
            cursor: Cursor::new(settings.width, settings.height),
            hub: BroadcastHub::new(),
            dispenser,
            loader,
            timer,
            tx,
            rx,
            ids: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Build a controller by reading both named sources through `loader`.
    pub fn load(
        settings: ControllerSettings,
        params_source: &str,
        targets_source: &str,
        dispenser: D,
        loader: L,
    ) -> Result<Self, CoreError> {
        let table = loader.load_params(params_source)?;
        let indices = loader.load_targets(targets_source)?;
        let sequencer = TargetSequencer::new(indices, Some(targets_source.to_string()))?;
        Self::new(settings, &table, sequencer, dispenser, loader)
    }

    /// A sender usable before and after the controller starts running.
    pub fn sender(&self) -> InputSender {
        InputSender {
            tx: self.tx.clone(),
            ids: self.ids.clone(),
        }
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.machine.state(),
            generation: self.machine.generation(),
            counters: self.machine.counters(),
            direction: self.machine.direction(),
            target: self.machine.target(),
            block: self.block(),
            cursor: self.cursor.position(),
            observers: self.hub.count(),
        }
    }

    /// Process inputs until `Shutdown` arrives.
    pub fn run(mut self) {
        tracing::info!("controller running");
        while let Ok(input) = self.rx.recv() {
            if matches!(input, Input::Shutdown) {
                break;
            }
            self.handle(input);
        }
        self.timer.disarm();
        tracing::info!(
            total = self.machine.counters().total,
            successful = self.machine.counters().successful,
            "controller stopped"
        );
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> ControllerHandle
    where
        D: Send + 'static,
        L: Send + 'static,
    {
        let sender = self.sender();
        let join = std::thread::spawn(move || self.run());
        ControllerHandle {
            sender,
            join: Some(join),
        }
    }

    /// Apply one input. `Shutdown` is a no-op here; `run` handles it.
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Event(event) => self.on_event(event),
            Input::Timeout { state, generation } => {
                if let Some(t) = self.machine.on_timeout(state, generation, &self.store) {
                    self.after_transition(&t);
                    self.broadcast_cursor();
                }
            }
            Input::Register { id, observer } => {
                self.hub.insert(id, observer);
                self.broadcast_users();
                let params = Snapshot::Params(ParamsSnapshot::from(self.store.params()));
                let cursor = self.cursor_snapshot();
                self.hub.send_to(id, &params);
                self.hub.send_to(id, &cursor);
            }
            Input::Unregister(id) => {
                if self.hub.unregister(id) {
                    self.broadcast_users();
                }
            }
            Input::Reload {
                kind,
                source,
                reply,
            } => {
                let result = match kind {
                    SourceKind::Params => self.reload_params(&source),
                    SourceKind::Targets => self.reload_targets(&source),
                };
                if let Some(reply) = reply
                    && reply.send(result).is_err()
                {
                    tracing::debug!(?kind, %source, "reload requester gone; reply dropped");
                }
            }
            Input::Status(reply) => {
                if reply.send(self.status()).is_err() {
                    tracing::debug!("status requester gone; reply dropped");
                }
            }
            Input::Shutdown => {}
        }
    }

    fn on_event(&mut self, event: Event) {
        let trigger = match event {
            Event::Cursor { x, y } => {
                let p = self.cursor.update(x, y, self.store.params());
                tracing::trace!(x = p.x, y = p.y, "cursor sample");
                if let Some(t) = self.machine.on_sample(p, &self.store) {
                    self.after_transition(&t);
                }
                self.broadcast_cursor();
                return;
            }
            Event::Params { filename } => {
                let _ = self.reload_params(&filename);
                return;
            }
            Event::Targets { filename } => {
                let _ = self.reload_targets(&filename);
                return;
            }
            Event::Start => Trigger::Start,
            Event::Resume => Trigger::Resume,
            Event::Pause => Trigger::Pause,
            Event::Stop => Trigger::Stop,
            Event::Reset => Trigger::Reset,
        };
        if let Some(t) = self.machine.fire(trigger, &self.store) {
            self.after_transition(&t);
            self.broadcast_cursor();
        }
    }

    fn after_transition(&mut self, t: &Transition) {
        match t.deadline {
            Some(after) => self.timer.arm(t.to, t.generation, after),
            None => self.timer.disarm(),
        }
        if t.has(Effect::SignalReward)
            && let Err(e) = self.dispenser.dispense()
        {
            tracing::warn!(error = %e, "reward dispenser failed; continuing trial");
        }
        if t.wrapped {
            self.refresh_targets();
        }
    }

    /// Re-read the named target source after a full pass. The previous
    /// sequence stays in use when the source cannot be read.
    fn refresh_targets(&mut self) {
        let Some(source) = self.machine.sequencer().source().map(str::to_owned) else {
            return;
        };
        let loaded = self.loader.load_targets(&source).and_then(|indices| {
            self.store.check_sequence(&indices)?;
            Ok(indices)
        });
        match loaded {
            Ok(indices) => {
                let len = indices.len();
                if let Err(e) = self.machine.sequencer_mut().replace(indices, Some(source.clone())) {
                    tracing::warn!(%source, error = %e, "target refresh failed; keeping previous sequence");
                    return;
                }
                tracing::debug!(%source, len, "target sequence refreshed");
            }
            Err(e) => {
                tracing::warn!(%source, error = %e, "target refresh failed; keeping previous sequence");
            }
        }
    }

    fn reload_params(&mut self, source: &str) -> Result<(), CoreError> {
        let result = self
            .loader
            .load_params(source)
            .and_then(|table| self.store.reload(&table, self.machine.sequencer().indices()));
        match &result {
            Ok(()) => {
                tracing::info!(
                    %source,
                    n_targets = self.store.params().n_targets,
                    tolerance = self.store.tolerance(),
                    "parameters reloaded"
                );
                let params = Snapshot::Params(ParamsSnapshot::from(self.store.params()));
                self.hub.broadcast(&params);
                self.broadcast_cursor();
            }
            Err(e) => {
                tracing::error!(%source, error = %e, "parameter reload failed; keeping previous configuration");
            }
        }
        result
    }

    fn reload_targets(&mut self, source: &str) -> Result<(), CoreError> {
        let result = self.loader.load_targets(source).and_then(|indices| {
            self.store.check_sequence(&indices)?;
            self.machine
                .sequencer_mut()
                .replace(indices, Some(source.to_string()))
        });
        match &result {
            Ok(()) => {
                tracing::info!(
                    %source,
                    len = self.machine.sequencer().indices().len(),
                    target = self.machine.target(),
                    "target sequence reloaded"
                );
                self.broadcast_cursor();
            }
            Err(e) => {
                tracing::error!(%source, error = %e, "target reload failed; keeping previous sequence");
            }
        }
        result
    }

    fn block(&self) -> Block {
        Block::for_trial(self.machine.counters().total, &self.store.params().trials)
    }

    fn cursor_snapshot(&self) -> Snapshot {
        let p = self.cursor.position();
        Snapshot::Cursor(CursorSnapshot::new(
            p.x,
            p.y,
            self.machine.target(),
            self.machine.state(),
            self.machine.direction(),
            self.block(),
        ))
    }

    fn broadcast_cursor(&mut self) {
        let snapshot = self.cursor_snapshot();
        self.hub.broadcast(&snapshot);
    }

    fn broadcast_users(&mut self) {
        let count = self.hub.count();
        self.hub.broadcast(&Snapshot::Users { count });
    }
}

/// Cloneable entry point into the controller queue. Every method only
/// enqueues, except the ones documented as waiting for a reply.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: xch::Sender<Input>,
    ids: Arc<AtomicU64>,
}

impl InputSender {
    pub fn send(&self, input: Input) -> Result<(), CoreError> {
        self.tx.send(input).map_err(|_| CoreError::Disconnected)
    }

    pub fn event(&self, event: Event) -> Result<(), CoreError> {
        self.send(Input::Event(event))
    }

    pub fn cursor(&self, x: f64, y: f64) -> Result<(), CoreError> {
        self.event(Event::Cursor { x, y })
    }

    /// Parse one JSON event and enqueue it. Malformed input is dropped with
    /// a warning and reported back.
    pub fn submit_json(&self, line: &str) -> Result<(), CoreError> {
        match Event::parse(line) {
            Ok(event) => self.event(event),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed event");
                Err(CoreError::Event(e.to_string()))
            }
        }
    }

    /// Register an observer. The id is allocated here so the caller can
    /// unregister it later; the registration itself is queued.
    pub fn register(&self, observer: Box<dyn Observer>) -> Result<ObserverId, CoreError> {
        let id = ObserverId(self.ids.fetch_add(1, Ordering::Relaxed));
        self.send(Input::Register { id, observer })?;
        Ok(id)
    }

    pub fn unregister(&self, id: ObserverId) -> Result<(), CoreError> {
        self.send(Input::Unregister(id))
    }

    /// Reload parameters and wait for the outcome.
    pub fn reload_params(&self, source: &str) -> Result<(), CoreError> {
        self.reload(SourceKind::Params, source)
    }

    /// Reload the target sequence and wait for the outcome.
    pub fn reload_targets(&self, source: &str) -> Result<(), CoreError> {
        self.reload(SourceKind::Targets, source)
    }

    fn reload(&self, kind: SourceKind, source: &str) -> Result<(), CoreError> {
        let (reply, rx) = xch::bounded(1);
        self.send(Input::Reload {
            kind,
            source: source.to_string(),
            reply: Some(reply),
        })?;
        rx.recv().map_err(|_| CoreError::Disconnected)?
    }

    /// Current status; waits for the controller to answer.
    pub fn status(&self) -> Result<Status, CoreError> {
        let (reply, rx) = xch::bounded(1);
        self.send(Input::Status(reply))?;
        rx.recv().map_err(|_| CoreError::Disconnected)
    }

    /// Ask the controller to stop without waiting for it.
    pub fn request_shutdown(&self) {
        let _ = self.tx.send(Input::Shutdown);
    }
}

/// Owner of the running controller thread. Dropping it shuts the controller
/// down and joins the thread.
#[derive(Debug)]
pub struct ControllerHandle {
    sender: InputSender,
    join: Option<std::thread::JoinHandle<()>>,
}

impl core::ops::Deref for ControllerHandle {
    type Target = InputSender;

    fn deref(&self) -> &InputSender {
        &self.sender
    }
}

impl ControllerHandle {
    pub fn sender(&self) -> InputSender {
        self.sender.clone()
    }

    /// Wait for the controller thread to finish without requesting it.
    pub fn join(mut self) -> Result<(), CoreError> {
        self.join_thread()
    }

    pub fn shutdown(mut self) -> Result<(), CoreError> {
        self.sender.request_shutdown();
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<(), CoreError> {
        match self.join.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CoreError::Source("controller thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.sender.request_shutdown();
            if let Err(e) = self.join_thread() {
                tracing::warn!(error = %e, "controller shutdown");
            }
        }
    }
}
