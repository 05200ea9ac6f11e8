//! Tidechat CLI - Terminal chat client
//!
//! A line-oriented frontend over `tidechat-core`. Messages are typed at
//! a prompt; streamed search progress, replies, and errors are printed
//! as they arrive.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default server (http://127.0.0.1:5000)
//! tidechat
//!
//! # Custom server
//! tidechat --server-url http://chat.example.com:5000
//!
//! # Verbose logging
//! RUST_LOG=debug tidechat
//! ```
//!
//! # Commands
//!
//! - `/new` - start a new conversation
//! - `/history` - list stored conversations
//! - `/open <id>` - load a stored conversation
//! - `/search on|off` - toggle web search
//! - `/quit` - exit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use tidechat_core::config::{self, ClientConfig};
use tidechat_core::render::{MarkupRenderer, PlainMarkup};
use tidechat_core::{
    ChatClient, ChatSurface, ExchangeRecord, HistoryEntry, HttpTransport, RenderedReply,
};

/// Terminal chat client for tidechat servers
#[derive(Parser, Debug)]
#[command(name = "tidechat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat server base URL
    #[arg(short = 's', long, env = "TIDECHAT_SERVER_URL", value_name = "URL")]
    server_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "TIDECHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start with web search disabled
    #[arg(long)]
    no_web_search: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TIDECHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "tidechat_cli={level},tidechat_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Console implementation of the chat surface.
struct ConsoleSurface {
    markup: PlainMarkup,
    progress_visible: bool,
}

impl ConsoleSurface {
    fn new() -> Self {
        Self {
            markup: PlainMarkup,
            progress_visible: false,
        }
    }
}

impl ChatSurface for ConsoleSurface {
    fn append_user_message(&mut self, _text: &str) {
        // The user just typed it; no echo needed on a line console.
    }

    fn show_progress(&mut self, _query: &str, web_search: bool) {
        self.progress_visible = true;
        if web_search {
            println!("  [searching the web...]");
        } else {
            println!("  [thinking...]");
        }
    }

    fn update_progress(&mut self, title: &str) {
        if self.progress_visible {
            println!("  [reading: {title}]");
        }
    }

    fn clear_progress(&mut self) {
        self.progress_visible = false;
    }

    fn append_reply(&mut self, reply: &RenderedReply) {
        if let Some(reasoning) = &reply.reasoning {
            println!();
            for line in reasoning.lines() {
                println!("  | {line}");
            }
        }
        println!();
        println!("{}", self.markup.render(&reply.answer));
        if reply.has_search_results {
            println!("  (answer includes web search results)");
        }
        println!();
    }

    fn append_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        if entries.is_empty() {
            println!("no stored conversations");
            return;
        }
        for entry in entries {
            println!("  {}  {}  {}", entry.id, entry.date(), entry.title);
        }
    }

    fn reset_conversation(&mut self) {
        println!("--- new conversation ---");
    }

    fn show_conversation(&mut self, exchanges: &[ExchangeRecord]) {
        for exchange in exchanges {
            println!("> {}", exchange.user);
            let reply = RenderedReply {
                reasoning: None,
                answer: exchange.bot.clone(),
                has_search_results: exchange.has_search_results(),
            };
            self.append_reply(&reply);
        }
    }
}

fn load_configuration(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => config::apply_env_overrides(
            config::load_config_from_path(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
        ),
        None => config::load_config().context("loading configuration")?,
    };

    if let Some(url) = &args.server_url {
        config.server_url = url.clone();
    }
    if args.no_web_search {
        config.enable_web_search = false;
    }
    Ok(config)
}

async fn handle_command(
    line: &str,
    client: &mut ChatClient<HttpTransport>,
    surface: &mut ConsoleSurface,
) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().unwrap_or_default().trim();

    match command {
        "/quit" | "/exit" => return false,
        "/new" => client.new_conversation(surface).await,
        "/history" => client.refresh_history(surface).await,
        "/open" => {
            if argument.is_empty() {
                println!("usage: /open <id>");
            } else {
                client.load_conversation(argument, surface).await;
            }
        }
        "/search" => match argument {
            "on" => {
                client.set_web_search(true).await;
                println!("web search on");
            }
            "off" => {
                client.set_web_search(false).await;
                println!("web search off");
            }
            _ => println!("usage: /search on|off"),
        },
        "/help" => {
            println!("/new  /history  /open <id>  /search on|off  /quit");
        }
        other => println!("unknown command: {other} (try /help)"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = load_configuration(&args)?;
    info!(server = %config.server_url, "connecting");

    let transport = HttpTransport::from_config(&config);
    let mut client = ChatClient::new(transport, config);
    let mut surface = ConsoleSurface::new();

    println!("tidechat {} - /help for commands", env!("CARGO_PKG_VERSION"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            if !handle_command(&line, &mut client, &mut surface).await {
                break;
            }
        } else {
            client.send_message(&line, &mut surface).await;
        }
    }

    info!("goodbye");
    Ok(())
}
