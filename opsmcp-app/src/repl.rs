//! Interactive loop: one request in flight at a time.

use crate::commands::render_response;
use opsmcp_core::Dispatcher;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared flag that admits at most one request at a time.
#[derive(Clone, Default)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the lifetime of a request; releases the guard on drop.
pub struct BusyPermit {
    busy: Arc<AtomicBool>,
}

impl BusyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<BusyPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for BusyPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Help,
    Status,
    Request,
}

pub fn parse_command(input: &str) -> ReplCommand {
    match input {
        "quit" | "exit" => ReplCommand::Quit,
        "help" => ReplCommand::Help,
        "status" => ReplCommand::Status,
        _ => ReplCommand::Request,
    }
}

pub struct Repl {
    dispatcher: Arc<Dispatcher>,
    busy: BusyGuard,
}

impl Repl {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            busy: BusyGuard::new(),
        }
    }

    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║              opsmcp DevOps Agent                                 ║");
        println!("║  Commands: quit, exit, status, help                              ║");
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        prompt();

        let mut lines = spawn_stdin_reader();
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            let line = tokio::select! {
                _ = token.cancelled() => break,
                line = lines.recv() => line,
            };

            let Some(line) = line else {
                info!("Input closed");
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                prompt();
                continue;
            }

            match parse_command(input) {
                ReplCommand::Quit => {
                    println!("👋 Goodbye!");
                    token.cancel();
                    break;
                }
                ReplCommand::Help => {
                    self.print_help();
                    prompt();
                    continue;
                }
                ReplCommand::Status => {
                    self.print_status();
                    prompt();
                    continue;
                }
                ReplCommand::Request => {}
            }

            let Some(permit) = self.busy.try_acquire() else {
                println!("⏳ Still working on the previous request; input ignored.");
                continue;
            };

            let dispatcher = self.dispatcher.clone();
            let request = input.to_string();
            in_flight = Some(tokio::spawn(async move {
                let _permit = permit;
                let response = render_response(dispatcher.handle(&request).await);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string())
                );
                prompt();
            }));
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                println!("⏳ Waiting for the running request to finish...");
            }
            let _ = handle.await;
        }

        Ok(())
    }

    fn print_help(&self) {
        println!("\n📖 Available Commands:");
        println!("  quit, exit  - Leave the agent");
        println!("  status      - Show request and model statistics");
        println!("  help        - Show this help message");
        println!("\n💡 Anything else is sent to the agent as a request.");
        println!("   Add \"[report]\" to get an explanation instead of execution.\n");
    }

    fn print_status(&self) {
        let stats = self.dispatcher.metrics().snapshot();
        println!("\n📊 Agent Status:");
        println!(
            "  State: {}",
            if self.busy.is_busy() { "busy" } else { "idle" }
        );
        println!(
            "  Classifications: {} ({} cached, {} failed, {} in cache)",
            stats.classify_requests,
            stats.classify_cache_hits,
            stats.classify_failures,
            self.dispatcher.classifier().cache().len()
        );
        println!(
            "  Model calls: {} ({:.0}% succeeded)",
            stats.model_attempts,
            stats.model_success_rate() * 100.0
        );
        println!(
            "  Commands: {} ({:.0}% succeeded)",
            stats.commands_run,
            stats.command_success_rate() * 100.0
        );
        println!("  Failed requests: {}", stats.dispatch_errors);
        println!();
    }
}

fn prompt() {
    print!("opsmcp> ");
    let _ = io::stdout().flush();
}

/// Blocking stdin reads live on a dedicated thread so shutdown never waits
/// on a pending read.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
