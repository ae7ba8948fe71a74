//! Stdio transport: events in on stdin, snapshots out on stdout.

use centerout_core::{ChannelObserver, Controller, ControllerSettings, CoreError, FsSources};
use centerout_traits::RewardDispenser;
use std::io::{BufRead, Write};

/// Stand-in dispenser for the stdio transport: the reward pulse is logged.
#[derive(Debug, Default)]
pub struct LogDispenser {
    pulses: u64,
}

impl RewardDispenser for LogDispenser {
    fn dispense(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pulses += 1;
        tracing::info!(pulses = self.pulses, "reward");
        Ok(())
    }
}

pub fn run(settings: ControllerSettings, params: &str, targets: &str) -> eyre::Result<()> {
    let controller = Controller::load(settings, params, targets, LogDispenser::default(), FsSources)?;
    let handle = controller.spawn();

    let (observer, lines) = ChannelObserver::pair();
    handle.register(Box::new(observer))?;

    let writer = std::thread::Builder::new()
        .name("stdout-writer".into())
        .spawn(move || {
            let stdout = std::io::stdout();
            for line in lines {
                let mut out = stdout.lock();
                if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
                    break;
                }
            }
        })?;

    {
        let sender = handle.sender();
        ctrlc::set_handler(move || {
            tracing::info!("interrupt received; stopping");
            sender.request_shutdown();
        })?;
    }

    let reader_tx = handle.sender();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match reader_tx.submit_json(line) {
                    Ok(()) | Err(CoreError::Event(_)) => {}
                    Err(_) => break,
                }
            }
            tracing::debug!("stdin closed");
            reader_tx.request_shutdown();
        })?;

    tracing::info!(params, targets, "controller running; send JSON events on stdin");
    handle.join()?;
    let _ = writer.join();
    Ok(())
}
