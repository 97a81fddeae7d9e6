use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::redirect::Policy;
use std::path::PathBuf;
use tokio::sync::mpsc;

use glean::config::Config;
use glean::feed::{category_counts, Aggregator, ItemFilter};
use glean::query::{
    category_query, Escalation, GenerativeClient, QueryError, QueryOrchestrator, SearchClient,
};
use glean::types::Item;
use glean::util::truncate_with_marker;

/// Get the default config file path (~/.config/glean/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("glean")
        .join("config.toml"))
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .timeout(config.request_timeout())
        .user_agent(concat!("glean/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Parser, Debug)]
#[command(
    name = "glean",
    about = "Aggregate news from RSS sources and ask questions with an AI assistant"
)]
struct Args {
    /// Config file (defaults to ~/.config/glean/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the active sources once and print the merged items
    Refresh {
        /// Only show items in this category
        #[arg(long)]
        category: Option<String>,

        /// Only show items whose title or description contains this text
        #[arg(long)]
        search: Option<String>,

        /// Print items as JSON
        #[arg(long)]
        json: bool,

        /// Maximum number of items to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Ask a question, falling back to news search if the assistant can't answer
    Ask {
        /// Free-text question
        #[arg(required_unless_present = "category", conflicts_with = "category")]
        query: Option<String>,

        /// Ask the canned question for a category instead
        #[arg(long)]
        category: Option<String>,

        /// Never fall back to news search
        #[arg(long)]
        no_fallback: bool,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let client = http_client(&config)?;

    match args.command {
        Command::Refresh {
            category,
            search,
            json,
            limit,
        } => {
            let filter = ItemFilter {
                category,
                search,
                favorites_only: false,
            };
            refresh(&config, client, &filter, json, limit).await
        }
        Command::Ask {
            query,
            category,
            no_fallback,
            json,
        } => {
            let query = match (query, category) {
                (Some(query), _) => query,
                (None, Some(category)) => category_query(&category).to_string(),
                (None, None) => anyhow::bail!("Provide a question or --category"),
            };
            let escalation = if no_fallback {
                Escalation::Disabled
            } else {
                Escalation::Auto
            };
            ask(&mut config, client, &query, escalation, json).await
        }
    }
}

async fn refresh(
    config: &Config,
    client: reqwest::Client,
    filter: &ItemFilter,
    json: bool,
    limit: usize,
) -> Result<()> {
    let aggregator = Aggregator::new(client, config.fetch_settings())
        .with_classifier(config.classifier())
        .with_max_sources(config.max_sources_per_cycle);

    let (progress_tx, mut progress_rx) = mpsc::channel::<(usize, usize)>(32);
    let progress = tokio::spawn(async move {
        while let Some((done, total)) = progress_rx.recv().await {
            eprint!("\rFetching sources: {done}/{total}");
        }
        eprintln!();
    });

    let result = aggregator
        .refresh_with_progress(&config.sources, &[], Some(&progress_tx))
        .await;
    drop(progress_tx);
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "Progress reporter task failed");
    }
    let items = result.context("Refresh failed")?;

    let visible: Vec<&Item> = filter.apply(&items).into_iter().take(limit).collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&visible).context("Failed to serialize items")?
        );
        return Ok(());
    }

    let classifier = aggregator.classifier();
    for item in &visible {
        let icon = classifier
            .rule(&item.category)
            .map(|r| r.icon.as_str())
            .unwrap_or("-");
        println!("[{}:{}] {}", icon, item.category, item.title);
        println!("    {} | {}", item.source, item.pub_date);
        if !item.description.is_empty() {
            println!("    {}", truncate_with_marker(&item.description, 100));
        }
        println!("    {}", item.link);
    }

    let counts = category_counts(&items);
    let summary: Vec<String> = counts
        .iter()
        .map(|(name, count)| format!("{name}: {count}"))
        .collect();
    println!();
    println!(
        "{} of {} items shown ({})",
        visible.len(),
        items.len(),
        summary.join(", ")
    );
    Ok(())
}

async fn ask(
    config: &mut Config,
    client: reqwest::Client,
    query: &str,
    escalation: Escalation,
    json: bool,
) -> Result<()> {
    let primary = GenerativeClient::new(
        client.clone(),
        &config.primary.base_url,
        &config.primary.model,
        config.primary.api_key.take(),
    )
    .context("Invalid [primary] configuration")?
    .with_generation(config.primary.max_output_tokens, config.primary.temperature);

    let secondary = SearchClient::new(
        client,
        &config.secondary.base_url,
        config.secondary.api_key.take(),
        config.secondary.search_options(),
    )
    .context("Invalid [secondary] configuration")?;

    let orchestrator = QueryOrchestrator::new(Box::new(primary), Box::new(secondary))
        .with_detector(Box::new(config.detector()));

    let answer = match orchestrator.ask(query, escalation).await {
        Ok(answer) => answer,
        Err(e @ (QueryError::PrimaryUnavailable | QueryError::SearchFailed(_))) => {
            // These carry user-facing guidance; print them without the error chain.
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&answer).context("Failed to serialize answer")?
        );
        return Ok(());
    }

    println!("{}", answer.answer);
    if !answer.results.is_empty() {
        println!();
        for result in &answer.results {
            println!("- {} ({:.0}%)", result.title, result.score * 100.0);
            println!("  {}", result.link);
        }
    }
    println!();
    println!(
        "Answered by {} provider in {:.2}s",
        answer.provider, answer.elapsed_secs
    );
    Ok(())
}
