// HealAI CLI - Command-line front end for the health assistant
//
// Usage: healai <command> [options]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;

use healai::{
    build_assistant, catalog, delete_api_key, get_config_dir, has_api_key, read_api_key,
    read_settings, validate_api_key, write_api_key, write_settings, AssistantSettings,
    ConversationSession, GeminiClient, Origin, SessionKind, Turn, TurnStatus,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Helper to safely serialize JSON for output. Returns error JSON if serialization fails.
fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"JSON serialization failed: {}\"}}", e))
}

#[derive(Parser)]
#[command(
    name = "healai",
    version = VERSION,
    about = "HealAI - Ask health questions and explore health topics",
    long_about = None
)]
struct Cli {
    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging (requests, retries)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat,

    /// Ask a single question
    Ask {
        /// The question to ask
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Explore a health topic, or list trending topics
    Explore {
        /// Topic name, or the number of a trending topic
        topic: Option<String>,
    },

    /// Show your health records
    Records,

    /// Show past conversations
    History,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// Manage API key
    #[command(name = "api-key")]
    ApiKey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
}

#[derive(Subcommand)]
enum ApiKeyAction {
    /// Check if API key is set
    Show,
    /// Set the API key
    Set {
        /// Your Gemini API key
        key: String,
    },
    /// Clear the API key
    Clear,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Chat => handle_chat(cli.json).await,
        Commands::Ask { message } => handle_ask(&message.join(" "), cli.json).await,
        Commands::Explore { topic } => handle_explore(topic, cli.json).await,
        Commands::Records => handle_records(cli.json),
        Commands::History => handle_history(cli.json),
        Commands::Config { action } => handle_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Build the Gemini client from saved settings. A missing key is not an
/// error here; the session reports it as a failed turn.
fn load_assistant(json: bool) -> Result<Arc<GeminiClient>, String> {
    let settings = read_settings().map_err(|e| e.to_string())?;
    let client = build_assistant(&settings, read_api_key()).map_err(|e| e.to_string())?;

    if !client.is_configured() && !json {
        eprintln!(
            "{} No API key configured. Set one with: {}",
            "Warning:".yellow(),
            "healai config api-key set <YOUR_KEY>".cyan()
        );
    }

    Ok(Arc::new(client))
}

// ============================================================================
// Conversation Handlers
// ============================================================================

/// Submit one message and wait for the assistant turn to settle.
async fn run_turn(session: &ConversationSession, message: &str) -> Result<Option<Turn>, String> {
    let Some(handle) = session.submit(message) else {
        return Ok(None);
    };
    handle
        .await
        .map_err(|e| format!("Assistant task failed: {}", e))?;
    Ok(session.last_turn())
}

fn print_turn(turn: &Turn, json: bool) {
    if json {
        println!("{}", to_json(turn));
        return;
    }

    let label = match turn.origin {
        Origin::User => "You".green().bold(),
        Origin::Assistant => "HealAI".cyan().bold(),
    };
    let text = match turn.status {
        TurnStatus::Final => turn.text.normal(),
        TurnStatus::Pending => turn.text.dimmed(),
        TurnStatus::Failed => turn.text.red(),
    };
    println!("{} {}", label, text);

    if !turn.sources.is_empty() {
        println!();
        println!("{}", "Sources".bold());
        for (i, source) in turn.sources.iter().enumerate() {
            println!("  {}. {} {}", i + 1, source.title, source.uri.dimmed());
        }
    }
}

/// Print a settled answer; a failed one becomes the command's error.
fn finish_turn(turn: Option<Turn>, json: bool) -> Result<(), String> {
    let turn = turn.ok_or("Nothing to ask")?;
    print_turn(&turn, json);
    if turn.status == TurnStatus::Failed && !json {
        return Err("The assistant could not answer".to_string());
    }
    Ok(())
}

async fn handle_chat(json: bool) -> Result<(), String> {
    let session = ConversationSession::new(SessionKind::Chat, load_assistant(json)?);

    if let Some(greeting) = session.last_turn() {
        print_turn(&greeting, json);
    }
    if !json {
        println!("{}", "Type a question, or /quit to leave.".dimmed());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !json {
            print!("{} ", ">".green().bold());
            use std::io::Write;
            std::io::stdout().flush().ok();
        }

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("Failed to read input: {}", e))?
        else {
            break;
        };

        if line.trim() == "/quit" {
            break;
        }

        session.set_compose(line);
        let Some(handle) = session.submit_compose() else {
            continue;
        };
        handle
            .await
            .map_err(|e| format!("Assistant task failed: {}", e))?;
        if let Some(turn) = session.last_turn() {
            print_turn(&turn, json);
        }
    }

    Ok(())
}

async fn handle_ask(message: &str, json: bool) -> Result<(), String> {
    let session = ConversationSession::new(SessionKind::Chat, load_assistant(json)?);
    let turn = run_turn(&session, message).await?;
    finish_turn(turn, json)
}

async fn handle_explore(topic: Option<String>, json: bool) -> Result<(), String> {
    let Some(topic) = topic else {
        let topics = catalog::trending_topics();
        if json {
            println!("{}", to_json(&serde_json::json!({ "trending": topics })));
        } else {
            println!("{}", "Trending".bold());
            println!();
            for (i, topic) in topics.iter().enumerate() {
                println!("  {}. {}", i + 1, topic);
            }
            println!("\nExplore one with: healai explore <topic or number>");
        }
        return Ok(());
    };

    let topic = catalog::find_trending(&topic)
        .map(str::to_string)
        .unwrap_or(topic);

    if !json {
        println!("{} Exploring '{}'...", "→".cyan(), topic);
    }

    let session = ConversationSession::new(SessionKind::Explore, load_assistant(json)?);
    let turn = run_turn(&session, &topic).await?;
    finish_turn(turn, json)
}

// ============================================================================
// Catalog Handlers
// ============================================================================

fn handle_records(json: bool) -> Result<(), String> {
    let records = catalog::records();

    if json {
        println!("{}", to_json(&serde_json::json!({ "records": records })));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Title", "Summary"]);
    for record in &records {
        table.add_row(vec![record.title, record.summary]);
    }
    println!("{table}");
    Ok(())
}

fn handle_history(json: bool) -> Result<(), String> {
    let history = catalog::history();

    if json {
        println!("{}", to_json(&serde_json::json!({ "history": history })));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Conversation", "Date"]);
    for entry in &history {
        table.add_row(vec![entry.title.to_string(), entry.date.to_string()]);
    }
    println!("{table}");
    println!("\n{} conversations total", history.len());
    Ok(())
}

// ============================================================================
// Config Handlers
// ============================================================================

fn handle_config(action: ConfigAction, json: bool) -> Result<(), String> {
    match action {
        ConfigAction::Show => {
            let settings = read_settings().map_err(|e| e.to_string())?;
            let has_key = has_api_key();
            let config_dir = get_config_dir();

            if json {
                println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "config_dir": config_dir.display().to_string(),
                        "api_key_set": has_key,
                        "endpoint": settings.resolved_endpoint(),
                        "settings": settings,
                    }))
                );
            } else {
                println!("{}", "Configuration".bold());
                println!();
                println!(
                    "  Config directory: {}",
                    config_dir.display().to_string().dimmed()
                );
                println!(
                    "  API key: {}",
                    if has_key {
                        "✓ set".green().to_string()
                    } else {
                        "✗ not set".red().to_string()
                    }
                );
                println!();
                println!("{}", "Assistant Settings".bold());
                println!();
                println!("  Model: {}", settings.model.cyan());
                println!("  Endpoint: {}", settings.resolved_endpoint());
                println!(
                    "  Retries: {} (first after {} ms, x{} each time)",
                    settings.max_retries, settings.initial_delay_ms, settings.backoff_multiplier
                );
                println!(
                    "  Search grounding: {}",
                    if settings.enable_search_grounding {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
            }
        }

        ConfigAction::Set { key, value } => {
            let mut settings = read_settings().map_err(|e| e.to_string())?;
            apply_setting(&mut settings, &key, &value)?;
            write_settings(&settings).map_err(|e| e.to_string())?;

            if json {
                println!("{}", serde_json::json!({ "updated": key, "value": value }));
            } else {
                println!("{} Set {} = {}", "✓".green(), key, value);
            }
        }

        ConfigAction::ApiKey { action } => match action {
            ApiKeyAction::Show => {
                if has_api_key() {
                    if json {
                        println!("{}", serde_json::json!({ "api_key_set": true }));
                    } else {
                        println!("{} API key is configured", "✓".green());
                    }
                } else if json {
                    println!("{}", serde_json::json!({ "api_key_set": false }));
                } else {
                    println!("{} No API key configured", "✗".red());
                    println!("\nSet with: healai config api-key set <YOUR_KEY>");
                }
            }

            ApiKeyAction::Set { key } => {
                validate_api_key(&key).map_err(|e| e.to_string())?;
                write_api_key(key.trim()).map_err(|e| e.to_string())?;

                if json {
                    println!("{}", serde_json::json!({ "status": "success" }));
                } else {
                    println!("{} API key saved", "✓".green());
                }
            }

            ApiKeyAction::Clear => {
                delete_api_key().map_err(|e| e.to_string())?;

                if json {
                    println!("{}", serde_json::json!({ "status": "cleared" }));
                } else {
                    println!("{} API key cleared", "✓".green());
                }
            }
        },
    }

    Ok(())
}

fn apply_setting(settings: &mut AssistantSettings, key: &str, value: &str) -> Result<(), String> {
    match key {
        "model" => settings.model = value.to_string(),
        "endpoint" => {
            settings.endpoint = if value.is_empty() || value == "default" {
                None
            } else {
                Some(value.to_string())
            }
        }
        "max_retries" | "retries" => {
            settings.max_retries = value
                .parse()
                .map_err(|_| "Invalid number for max_retries")?;
        }
        "initial_delay_ms" | "delay" => {
            settings.initial_delay_ms = value
                .parse()
                .map_err(|_| "Invalid number for initial_delay_ms")?;
        }
        "backoff_multiplier" | "multiplier" => {
            settings.backoff_multiplier = value
                .parse()
                .map_err(|_| "Invalid number for backoff_multiplier")?;
        }
        "search_grounding" | "enable_search_grounding" => {
            settings.enable_search_grounding = value
                .parse()
                .map_err(|_| "Invalid boolean for search_grounding")?;
        }
        _ => return Err(format!("Unknown config key: {}", key)),
    }
    Ok(())
}
