//! Concierge CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use concierge::a2a::A2aClient;
use concierge::adapters::{Channel, ChannelRegistry, CliChannel, HttpChannel, TelegramChannel};
use concierge::agent::{MessageProcessor, ProviderRegistry};
use concierge::config::Settings;
use concierge::directory::HttpDirectory;
use concierge::manager::AssistantManager;
use concierge::shell::BotShell;
use concierge::ui;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Concierge - talk to the assistants in your registry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP channel (and Telegram, when a bot token is set)
    Serve,

    /// Chat from the terminal
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the assistants in the registry
    Assistants,

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            ui::print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    match cli.command {
        Commands::Serve => serve(settings).await?,

        Commands::Chat { message } => {
            let shell = build_shell(&settings)?;
            shell.start().await?;
            let channel = CliChannel::new(shell);

            if let Some(msg) = message {
                channel.run_once(&msg).await;
            } else {
                install_ctrlc_handler();
                print_header(&settings);
                println!("Interactive mode (Ctrl+C to exit)\n");
                channel.start().await?;
            }
        }

        Commands::Assistants => {
            let manager = build_manager(&settings)?;
            ui::print_step(&format!("Fetching assistants from {}", settings.upstream_base_url));
            manager.initialize().await?;

            let assistants = manager.get_all_assistants().await;
            if assistants.is_empty() {
                ui::print_warning("The registry has no assistants");
            }
            for assistant in assistants {
                println!("  {}  ({})  {}", assistant.name, assistant.slug, assistant.url);
            }
        }

        Commands::Status => {
            print_header(&settings);
            println!("Providers: {}", ProviderRegistry::available().join(", "));
            println!("Request timeout: {:?}", settings.request_timeout);
            println!("Max iterations: {}", settings.max_iterations);
            println!(
                "Registry cookies: {}",
                if settings.auth_cookies.is_some() { "✓" } else { "not set" }
            );
            println!("\nChannels:");
            for name in ChannelRegistry::available() {
                let mark = if ChannelRegistry::is_enabled(name, &settings) { "✓" } else { "-" };
                println!("  {} {:<10} {}", mark, name, ChannelRegistry::description(name));
            }
        }
    }

    Ok(())
}

fn print_header(settings: &Settings) {
    ui::print_header(
        &settings.chat_model,
        settings.provider.name(),
        &settings.upstream_base_url,
    );
}

fn build_manager(settings: &Settings) -> Result<Arc<AssistantManager>> {
    let directory = Arc::new(HttpDirectory::from_settings(settings)?);
    let dispatcher = Arc::new(A2aClient::new(
        settings.request_timeout,
        settings.auth_cookies.clone(),
    )?);
    Ok(Arc::new(AssistantManager::new(directory, dispatcher)))
}

fn build_shell(settings: &Settings) -> Result<Arc<BotShell>> {
    let manager = build_manager(settings)?;
    let client = ProviderRegistry::create(settings)?;
    let processor = MessageProcessor::new(client, manager.clone(), settings.max_iterations);
    Ok(Arc::new(BotShell::new(manager, processor)))
}

async fn serve(settings: Settings) -> Result<()> {
    let shell = build_shell(&settings)?;

    ui::print_step("Loading assistants...");
    if let Err(e) = shell.start().await {
        ui::print_error(&format!("Startup failed: {e}"));
        return Err(e.into());
    }
    ui::print_success(&format!(
        "Loaded {} assistants",
        shell.manager().get_all_assistants().await.len()
    ));

    let http = HttpChannel::new(shell.clone(), &settings.host, settings.port);
    ui::print_step(&format!("Listening on {}:{}", settings.host, settings.port));

    if settings.telegram.enabled() {
        let telegram = TelegramChannel::new(&settings.telegram, shell)?;
        ui::print_step("Listening for Telegram messages");
        tokio::try_join!(http.start(), telegram.start())?;
    } else {
        http.start().await?;
    }

    Ok(())
}

fn install_ctrlc_handler() {
    let exit_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\nBye!");
            std::process::exit(0);
        } else {
            println!("\nPress Ctrl+C again to exit");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    })
    .ok();
}
