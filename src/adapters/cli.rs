//! CLI adapter - interactive and single-message command line interface.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use colored::*;

use super::Channel;
use crate::agent::InboundMessage;
use crate::shell::{BotShell, Replier};
use crate::ui;
use crate::Result;

/// CLI channel for interactive sessions.
pub struct CliChannel {
    shell: Arc<BotShell>,
}

struct ConsoleReplier;

#[async_trait]
impl Replier for ConsoleReplier {
    async fn typing(&self) -> Result<()> {
        ui::print_thinking("Thinking");
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<()> {
        println!("\n{}: {}\n", "Concierge".green().bold(), text);
        Ok(())
    }
}

impl CliChannel {
    pub fn new(shell: Arc<BotShell>) -> Self {
        Self { shell }
    }

    /// Send a single message and print the reply.
    pub async fn run_once(&self, message: &str) {
        let inbound = InboundMessage::new("cli", message);
        self.shell.handle(&inbound, &ConsoleReplier).await;
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}: ", "You".blue().bold());
            stdout.flush()?;

            let mut line = String::new();
            let read = stdin.lock().read_line(&mut line)?;
            if read == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if is_exit_command(input) {
                println!("Goodbye!");
                break;
            }

            self.run_once(input).await;
        }

        Ok(())
    }
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn start(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        let this = CliChannel {
            shell: self.shell.clone(),
        };
        async move { this.run_interactive().await }
    }
}
