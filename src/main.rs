use anyhow::{Context, Result, bail};
use clap::Parser;
use itinerary_ai::agent::{PlanSource, TravelAgent};
use itinerary_ai::config::Config;
use itinerary_ai::llm::Provider;
use itinerary_ai::model::{Itinerary, Theme, TripRequest};
use itinerary_ai::output::{self, TripPage};
use itinerary_ai::web::{self, AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "itinerary-ai",
    about = "AI assisted travel itinerary planner with Maps enrichment and narrated days"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the planner web UI (default)
    Serve {
        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Address to listen on, e.g. 127.0.0.1:8501
        #[arg(long)]
        bind: Option<String>,

        /// LLM provider override: gemini, openai
        #[arg(long)]
        provider: Option<String>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Plan one trip and print the itinerary JSON
    Plan {
        /// Destination city or region
        destination: String,

        /// Number of days
        #[arg(short, long, default_value_t = 3)]
        days: u32,

        /// Trip theme: "Historical and Cultural", "Food and Leisure", "Adventure and Nature"
        #[arg(short, long, default_value = "Historical and Cultural")]
        theme: String,

        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// LLM provider override: gemini, openai
        #[arg(long)]
        provider: Option<String>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Render an itinerary JSON file to a standalone HTML page (no API calls)
    Render {
        /// Path to itinerary JSON file
        itinerary: PathBuf,

        /// Output path for the HTML page
        #[arg(short, long, default_value = "itinerary.html")]
        output: PathBuf,
    },
}

fn load_config(path: &Path, provider: Option<String>, model: Option<String>) -> Result<Config> {
    let mut cfg = Config::load_or_default(path)?;
    if let Some(p) = provider {
        cfg.llm.provider = match p.as_str() {
            "gemini" => Provider::Gemini,
            "openai" => Provider::OpenAi,
            other => bail!("unknown provider '{other}' (expected gemini or openai)"),
        };
    }
    if let Some(m) = model {
        cfg.llm.model = m;
    }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "itinerary_ai=info,tower_http=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve {
        config: PathBuf::from("config.toml"),
        bind: None,
        provider: None,
        model: None,
    }) {
        Command::Serve {
            config,
            bind,
            provider,
            model,
        } => {
            let cfg = load_config(&config, provider, model)?;
            let agent = TravelAgent::from_config(&cfg)?;
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            web::serve(Arc::new(AppState::new(agent)), &bind)
                .await
                .with_context(|| format!("serving on {bind}"))
        }
        Command::Plan {
            destination,
            days,
            theme,
            config,
            provider,
            model,
        } => {
            let theme = Theme::from_label(&theme)
                .with_context(|| format!("unknown theme '{theme}'"))?;
            let cfg = load_config(&config, provider, model)?;
            let agent = TravelAgent::from_config(&cfg)?;
            let outcome = agent
                .plan_trip(&TripRequest::new(destination, days, theme))
                .await?;
            if let Some(notice) = outcome.source.notice() {
                eprintln!("{notice}");
            }
            println!("{}", serde_json::to_string_pretty(&outcome.itinerary)?);
            Ok(())
        }
        Command::Render { itinerary, output } => render_from_file(&itinerary, &output),
    }
}

fn render_from_file(itinerary_path: &Path, output_path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(itinerary_path)
        .with_context(|| format!("reading {}", itinerary_path.display()))?;
    let itinerary: Itinerary = serde_json::from_str(&raw)?;
    itinerary.validate()?;

    let html = output::render_static(&TripPage {
        id: "local",
        itinerary: &itinerary,
        source: PlanSource::Model,
        model: "saved itinerary",
        narration_available: false,
    })?;
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, &html)?;

    println!(
        "Itinerary rendered: {} ({}, {} days)",
        output_path.display(),
        itinerary.destination,
        itinerary.daily_itinerary.len()
    );
    Ok(())
}
