//! Background deadline timer.
//!
//! One thread holds at most one armed deadline. When it elapses the thread
//! enqueues `Input::Timeout { state, generation }` on the controller queue,
//! where the machine's generation guard decides whether it still applies.
//!
//! Each `DeadlineTimer` owns exactly one thread, shut down and joined when the
//! timer is dropped.
use crate::controller::Input;
use crate::machine::TrialState;
use centerout_traits::clock::Clock;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Upper bound on how long the idle thread waits before rechecking shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Arm {
        state: TrialState,
        generation: u64,
        after: Duration,
    },
    Disarm,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    at: Instant,
    state: TrialState,
    generation: u64,
}

pub struct DeadlineTimer {
    cmd_tx: xch::Sender<Command>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for DeadlineTimer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeadlineTimer")
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

impl DeadlineTimer {
    pub fn spawn<C: Clock + Send + 'static>(out: xch::Sender<Input>, clock: C) -> Self {
        let (cmd_tx, cmd_rx) = xch::unbounded::<Command>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut armed: Option<Armed> = None;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("timer thread received shutdown signal");
                    break;
                }

                let received = match armed {
                    Some(a) => cmd_rx.recv_deadline(a.at),
                    None => cmd_rx.recv_timeout(IDLE_POLL),
                };

                match received {
                    Ok(Command::Arm {
                        state,
                        generation,
                        after,
                    }) => {
                        armed = clock.deadline_after(after).map(|at| Armed {
                            at,
                            state,
                            generation,
                        });
                        if armed.is_none() {
                            tracing::debug!(
                                state = state.wire_name(),
                                generation,
                                ?after,
                                "deadline beyond clock range; left unarmed"
                            );
                        }
                    }
                    Ok(Command::Disarm) => armed = None,
                    Err(xch::RecvTimeoutError::Timeout) => {
                        let Some(a) = armed else { continue };
                        if clock.now() < a.at {
                            continue;
                        }
                        armed = None;
                        tracing::trace!(state = a.state.wire_name(), generation = a.generation, "deadline elapsed");
                        let input = Input::Timeout {
                            state: a.state,
                            generation: a.generation,
                        };
                        if out.send(input).is_err() {
                            tracing::debug!("timer consumer disconnected, exiting thread");
                            break;
                        }
                    }
                    Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("timer thread exiting cleanly");
        });

        Self {
            cmd_tx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Replace any armed deadline with `after` from now for `(state, generation)`.
    /// A deadline too far out to represent never fires.
    pub fn arm(&self, state: TrialState, generation: u64, after: Duration) {
        self.command(Command::Arm {
            state,
            generation,
            after,
        });
    }

    pub fn disarm(&self) {
        self.command(Command::Disarm);
    }

    fn command(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::debug!(?cmd, "timer thread gone; command dropped");
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the thread so it sees the flag without waiting out a deadline.
        let _ = self.cmd_tx.send(Command::Disarm);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("timer thread joined"),
                Err(e) => tracing::warn!(?e, "timer thread panicked during shutdown"),
            }
        }
    }
}
