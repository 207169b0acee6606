use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chatgpt_client::diagnostics::{DiagnosticSink, WriterSink};
use chatgpt_client::{Client, ClientOptions, Conversation};
use chatgpt_config::{ClientConfig, Config};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "chatgpt", about = "ChatGPT in the terminal", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Session token (the __Secure-next-auth.session-token cookie)
    #[arg(long, global = true)]
    session_token: Option<String>,

    /// Root URL for both the auth and the conversation endpoints
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Dump raw HTTP requests and responses
    #[arg(long, global = true)]
    debug: bool,

    /// Write the --debug dump to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    dump: Option<PathBuf>,

    /// Do not refresh the access token before each turn
    #[arg(long, global = true)]
    no_auto_refresh: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and stream the reply to stdout
    Run {
        /// The prompt to send
        prompt: String,
    },
    /// Exchange the session token for an access token and show its expiry
    Auth,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    Config::ensure_dirs()?;

    init_tracing(cli.command.is_none())?;
    apply_overrides(&mut config.client, &cli);

    let Some(command) = &cli.command else {
        let client = build_client(&cli, &config.client, true)?;
        tracing::info!(model = client.model(), "Starting interactive session");
        let mut app = chatgpt_tui::App::new(&config.tui, client.model());
        let unsent = app.run(Arc::new(Conversation::new(Arc::new(client)))).await?;
        if !unsent.trim().is_empty() {
            println!("{unsent}");
        }
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    execute(&cli, command, &config, &cancel, &mut std::io::stdout()).await
}

async fn execute<W: Write>(
    cli: &Cli,
    command: &Commands,
    config: &Config,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Config => {
            writeln!(out, "Config path: {}", Config::config_path().display())?;
            writeln!(
                out,
                "Session token source: {}",
                chatgpt_auth::credential_source(cli.session_token.as_deref(), &config.client)
            )?;
            writeln!(out, "{}", toml::to_string_pretty(&config.redacted())?)?;
        }
        Commands::Auth => {
            let client = build_client(cli, &config.client, false)?;
            let token = client.auth(cancel).await?;
            writeln!(out, "Access token valid until {}", token.expires_at().to_rfc3339())?;
        }
        Commands::Run { prompt } => {
            let client = build_client(cli, &config.client, false)?;
            let conversation = Conversation::new(Arc::new(client));
            run_once(&conversation, prompt, cancel, out).await?;
        }
    }
    Ok(())
}

fn init_tracing(interactive: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(if interactive { "chatgpt=info" } else { "chatgpt=warn" }.parse()?),
        )
        .with_target(false);

    if interactive {
        let path = Config::data_dir().join("chatgpt.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

fn apply_overrides(config: &mut ClientConfig, cli: &Cli) {
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    if cli.no_auto_refresh {
        config.auto_refresh = false;
    }
    if cli.debug || cli.dump.is_some() {
        config.diagnostics = true;
    }
    if let Some(path) = &cli.dump {
        config.diagnostics_file = Some(path.clone());
    }
}

/// The terminal UI owns stderr while it runs, so interactive diagnostics
/// without an explicit file land in the data directory.
fn build_client(cli: &Cli, config: &ClientConfig, interactive: bool) -> Result<Client> {
    let credential = chatgpt_auth::resolve_credential(cli.session_token.as_deref(), config)?;
    tracing::debug!(
        source = chatgpt_auth::credential_source(cli.session_token.as_deref(), config),
        "Resolved session token"
    );
    let mut options = ClientOptions::from_config(config);

    if config.diagnostics {
        let file = match &config.diagnostics_file {
            Some(path) => Some(path.clone()),
            None if interactive => Some(Config::data_dir().join("diagnostics.log")),
            None => None,
        };
        if let Some(path) = file {
            options = options.with_diagnostics(file_sink(&path)?);
        }
    }

    Ok(Client::new(credential, options))
}

fn file_sink(path: &Path) -> Result<Arc<dyn DiagnosticSink>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open dump file {}", path.display()))?;
    Ok(Arc::new(WriterSink::new(file)))
}

async fn run_once<W: Write>(
    conversation: &Conversation,
    prompt: &str,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    tracing::info!(chars = prompt.chars().count(), "Sending prompt");

    let mut printed = String::new();
    let result = conversation
        .send_turn(cancel, prompt, |event| {
            if let Some(text) = event.message().and_then(|m| m.text()) {
                let _ = out.write_all(unprinted(&printed, text).as_bytes());
                let _ = out.flush();
                printed = text.to_string();
            }
        })
        .await;

    match result {
        Ok(reply) => {
            writeln!(out, "{}", unprinted(&printed, &reply))?;
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Turn failed");
            if !printed.is_empty() {
                writeln!(out)?;
            }
            Err(e.into())
        }
    }
}

/// Each event carries the whole reply so far. Returns the part not yet on
/// screen, or the whole text on a new line when the reply was rewritten.
fn unprinted(printed: &str, text: &str) -> String {
    match text.strip_prefix(printed) {
        Some(rest) => rest.to_string(),
        None => format!("\n{text}"),
    }
}
