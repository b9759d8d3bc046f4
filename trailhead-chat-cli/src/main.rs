//! Trailhead Chat CLI Tool
//!
//! Interactive loop over the dialogue controller: one line in, one
//! assistant reply out, until the session ends or the user quits.

use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use trailhead::capabilities::{OpenMeteoWeather, OverpassPlaces};
use trailhead::catalog::TrailCatalog;
use trailhead::config::TrailheadConfig;
use trailhead::dialogue::DialogueController;
use trailhead::llm::{LlmProvider, OpenAiLlmProvider, StubLlmProvider};

#[derive(Parser, Debug)]
#[command(name = "trailhead-chat")]
struct Args {
    /// Path to the trail catalog (JSON array of trail records)
    #[arg(long, default_value = "data/trails.json")]
    catalog: PathBuf,

    /// Optional TOML config for collaborator endpoints and the LLM
    #[arg(long)]
    config: Option<PathBuf>,

    /// API key for the OpenAI-compatible reasoning/narrative service
    #[arg(long, env = "TRAILHEAD_API_KEY")]
    api_key: Option<String>,

    /// Skip the external LLM entirely; selection uses the deterministic
    /// fallback and replies use templates
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrailheadConfig::load(path)?,
        None => TrailheadConfig::default(),
    };
    if args.api_key.is_some() {
        config.llm.api_key = args.api_key.clone();
    }

    let catalog = Arc::new(TrailCatalog::load_json(&args.catalog)?);

    let llm: Arc<dyn LlmProvider> = if args.offline {
        Arc::new(StubLlmProvider::new())
    } else if config.llm.api_key.is_none() {
        warn!("no API key configured, running with the deterministic fallback");
        Arc::new(StubLlmProvider::new())
    } else {
        Arc::new(OpenAiLlmProvider::new(config.llm.clone())?)
    };
    let weather = Arc::new(OpenMeteoWeather::new(config.weather.clone())?);
    let places = Arc::new(OverpassPlaces::new(config.places.clone())?);

    let mut controller = DialogueController::new(catalog.clone(), llm, weather, places);

    println!("{}", "=========================================".blue());
    println!("{}", "        Trailhead - plan your hike       ".blue().bold());
    println!("{}", "=========================================".blue());
    println!("{}", format!("{} trails loaded.", catalog.len()).dimmed());
    println!("{}", "Type 'exit' or 'quit' to stop.".dimmed());
    println!();
    println!("{} {}", "Agent:".cyan().bold(), controller.opening_prompt());

    loop {
        print!("{} ", "You:".yellow().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = controller.handle_turn(input).await;
        println!("{} {}", "Agent:".cyan().bold(), reply);
    }

    println!("{}", "Goodbye, enjoy your hike!".green());
    Ok(())
}
