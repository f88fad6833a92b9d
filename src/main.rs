use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use ticketscope::config::Config;
use ticketscope::llm::client::LlmClient;
use ticketscope::pipeline::{self, BatchProgress, TokioSleep};
use ticketscope::report;
use ticketscope::store::{FileKvStore, TicketStore};
use ticketscope::zendesk::{self, ZendeskClient};

#[derive(Parser, Debug)]
#[command(
    name = "ticketscope",
    about = "Classify support tickets with an LLM and surface recurring topics",
    version
)]
struct Cli {
    /// Override the data directory (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactively configure helpdesk and LLM credentials
    Setup,
    /// Fetch recent tickets (with comment threads) from the helpdesk
    Fetch {
        /// Days back to fetch (defaults to the configured lookback)
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Classify every stored ticket, then aggregate topics
    Classify,
    /// Show sentiment breakdown, type frequencies, and topic clusters
    Report,
    /// Show the prompt templates, or restore the defaults
    Prompt {
        /// Restore both prompt templates to the built-in defaults
        #[arg(long)]
        reset: bool,
    },
    /// Delete all stored tickets and the topic summary
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|p| p.join("ticketscope"))
            .unwrap_or_else(|| PathBuf::from(".ticketscope"))
    })
}

fn open_store(cli: &Cli) -> Result<TicketStore<FileKvStore>> {
    let kv = FileKvStore::new(data_dir(cli))?;
    Ok(TicketStore::load(kv))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Setup => setup_interactive(),
        Commands::Fetch { days } => fetch(&cli, days).await,
        Commands::Classify => classify(&cli).await,
        Commands::Report => show_report(&cli),
        Commands::Prompt { reset } => prompt(&cli, reset),
        Commands::Clear { yes } => clear(&cli, yes),
    }
}

async fn fetch(cli: &Cli, days: Option<i64>) -> Result<()> {
    let config = Config::load();
    if !config.has_zendesk_credentials() {
        bail!(
            "helpdesk credentials are not configured; run `ticketscope setup` first \
             (config: {})",
            Config::config_location()
        );
    }
    let email = config.zendesk_email.as_deref().unwrap_or_default();
    let token = config.zendesk_api_token.as_deref().unwrap_or_default();
    let api = ZendeskClient::new(&config.zendesk_subdomain, email, token)?;

    let lookback = days.unwrap_or(config.lookback_days);
    println!("  Fetching tickets from the last {} days...", lookback);
    let tickets = zendesk::fetch_recent(&api, lookback).await?;
    let count = tickets.len();

    let mut store = open_store(cli)?;
    store.replace_all(tickets);
    store.persist()?;
    println!("  Stored {} tickets.", count);
    Ok(())
}

async fn classify(cli: &Cli) -> Result<()> {
    let config = Config::load();
    if !config.has_llm_credentials() {
        bail!(
            "LLM endpoint and API key are not configured; run `ticketscope setup` first \
             (config: {})",
            Config::config_location()
        );
    }
    let endpoint = config.llm_endpoint.as_deref().unwrap_or_default();
    let api_key = config
        .llm_api_key()
        .context("LLM API key disappeared between check and use")?;
    let transport = LlmClient::new(endpoint, &api_key, config.llm_model.clone())?;

    let mut store = open_store(cli)?;
    if store.is_empty() {
        bail!("no tickets stored; run `ticketscope fetch` first");
    }

    let (outcome, summary) = pipeline::classify_and_summarize(
        &transport,
        &mut store,
        &TokioSleep,
        |p: BatchProgress| {
            print!("\r  Classifying {}/{} ({}%)", p.index, p.total, p.percent);
            let _ = io::stdout().flush();
        },
    )
    .await?;
    println!();
    println!(
        "  Classified {} tickets ({} failed).",
        outcome.classified, outcome.failed
    );

    match summary {
        Some(summary) => {
            println!("  Found {} topics:", summary.topics.len());
            for cluster in &summary.topics {
                println!(
                    "    [{}] {} ({} tickets)",
                    cluster.priority.as_str(),
                    cluster.topic,
                    cluster.ticket_ids.len()
                );
            }
        }
        None => println!("  No topic summary generated."),
    }
    Ok(())
}

fn show_report(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    if store.is_empty() {
        println!("  No tickets stored. Run `ticketscope fetch` first.");
        return Ok(());
    }

    let counts = report::sentiment_counts(store.tickets());
    println!("  Tickets: {}", counts.total());
    println!(
        "  Sentiment: {} positive, {} neutral, {} negative, {} unclassified",
        counts.positive, counts.neutral, counts.negative, counts.unclassified
    );

    let frequencies = report::type_frequencies(store.tickets());
    if !frequencies.is_empty() {
        println!();
        println!("  Ticket types:");
        for (label, count) in &frequencies {
            println!("    {:>4}  {}", count, label);
        }
    }

    if let Some(summary) = store.topic_summary() {
        println!();
        match summary.generated_at {
            Some(at) => println!("  Topics (generated {}):", at.format("%Y-%m-%d %H:%M UTC")),
            None => println!("  Topics:"),
        }
        for cluster in &summary.topics {
            println!(
                "    [{}] {}: {}",
                cluster.priority.as_str(),
                cluster.topic,
                cluster.description
            );
            println!(
                "          tickets: {}",
                cluster
                    .ticket_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    Ok(())
}

fn prompt(cli: &Cli, reset: bool) -> Result<()> {
    let mut store = open_store(cli)?;
    if reset {
        store.reset_prompts()?;
        println!("  Prompt templates restored to defaults.");
        return Ok(());
    }
    println!("--- Classification prompt ---");
    println!("{}", store.classification_prompt());
    println!();
    println!("--- Aggregation prompt ---");
    println!("{}", store.aggregation_prompt());
    Ok(())
}

fn clear(cli: &Cli, yes: bool) -> Result<()> {
    let mut store = open_store(cli)?;
    if store.is_empty() && store.topic_summary().is_none() {
        println!("  Nothing to clear.");
        return Ok(());
    }
    if !yes {
        print!(
            "  Delete {} stored tickets and the topic summary? [y/N] ",
            store.tickets().len()
        );
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("  Aborted.");
            return Ok(());
        }
    }
    store.clear()?;
    println!("  Cleared.");
    Ok(())
}

/// Interactive prompt to set up helpdesk and LLM credentials
fn setup_interactive() -> Result<()> {
    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  TICKETSCOPE SETUP                                      │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    println!("  Helpdesk: leave the subdomain empty to use a local mock");
    println!("  server at http://localhost:3001.");
    println!();

    let mut config = Config::load();

    config.zendesk_subdomain = ask("Zendesk subdomain (or http(s):// origin)", {
        let current = config.zendesk_subdomain.clone();
        if current.is_empty() { None } else { Some(current) }
    })?;
    config.zendesk_email = non_empty(ask("Agent email", config.zendesk_email.take())?);
    config.zendesk_api_token = non_empty(ask("API token", config.zendesk_api_token.take())?);

    println!();
    println!("  LLM: any OpenAI-compatible chat-completions endpoint works,");
    println!("  including local servers.");
    println!();

    config.llm_endpoint = non_empty(ask("Chat completions URL", config.llm_endpoint.take())?);
    config.llm_api_key = non_empty(ask("LLM API key", config.llm_api_key.take())?);
    config.llm_model = non_empty(ask("Model (empty for server default)", config.llm_model.take())?);

    config.save()?;
    println!();
    println!("  + Settings saved to {}", Config::config_location());
    println!();
    Ok(())
}

fn ask(label: &str, current: Option<String>) -> Result<String> {
    match &current {
        Some(value) => print!("  {} [{}]: ", label, value),
        None => print!("  {}: ", label),
    }
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        Ok(current.unwrap_or_default())
    } else {
        Ok(input.to_string())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
