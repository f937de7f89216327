use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hub_planner::domain::{HubId, LineId};
use hub_planner::graph;
use hub_planner::pipeline::{Pipeline, PipelineConfig};
use hub_planner::planner::{JourneySearch, SearchConfig};
use hub_planner::source::{
    CacheConfig, CachedSource, FixtureSource, TransitClient, TransitConfig, TransitSource,
};
use hub_planner::stations::{NameMatch, StationNames};
use hub_planner::web::{AppState, create_router};

/// Environment variable holding the upstream API key.
const APP_KEY_VAR: &str = "TRANSIT_APP_KEY";

#[derive(Parser)]
#[command(name = "hub-planner", about = "Build a hub graph and query journey times")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the build pipeline and write the graph.
    Build {
        /// Pipeline configuration (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Build only these lines instead of every line of the configured modes.
        #[arg(long = "line")]
        lines: Vec<String>,

        /// Serve upstream data from a fixture network instead of the live API.
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Where to write the graph.
        #[arg(long, default_value = "hub_graph.json")]
        output: PathBuf,

        /// Seconds an upstream response stays cached.
        #[arg(long, default_value_t = 86_400)]
        cache_ttl_secs: u64,
    },

    /// Find the fastest journey between two stations.
    Query {
        #[arg(long, default_value = "hub_graph.json")]
        graph: PathBuf,

        /// Transfer penalty in minutes.
        #[arg(long, default_value_t = 5.0)]
        penalty: f64,

        from: String,
        to: String,
    },

    /// Serve the HTTP API over a built graph.
    Serve {
        #[arg(long, default_value = "hub_graph.json")]
        graph: PathBuf,

        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Transfer penalty in minutes.
        #[arg(long, default_value_t = 5.0)]
        penalty: f64,

        /// Time allowed for a meeting ranking before it returns partial results.
        #[arg(long, default_value_t = 10_000)]
        meet_budget_ms: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Build {
            config,
            lines,
            fixture,
            output,
            cache_ttl_secs,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::from_file(path)?,
                None => PipelineConfig::default(),
            };
            if !lines.is_empty() {
                let lines = lines
                    .into_iter()
                    .map(LineId::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                config = config.with_lines(lines);
            }

            match fixture {
                Some(path) => {
                    info!(fixture = %path.display(), "Building from fixture network");
                    build(FixtureSource::from_file(path)?, config, &output).await
                }
                None => {
                    let app_key = std::env::var(APP_KEY_VAR).ok();
                    if app_key.is_none() {
                        warn!("{APP_KEY_VAR} not set; requests will be rate limited");
                    }
                    let client = TransitClient::new(TransitConfig::new(app_key))?;
                    let cache = CacheConfig::default().with_ttl(Duration::from_secs(cache_ttl_secs));
                    let source = CachedSource::new(client, &cache);
                    build(source, config, &output).await
                }
            }
        }

        Command::Query {
            graph: path,
            penalty,
            from,
            to,
        } => {
            let hub_graph = graph::load(&path)?;
            let names = StationNames::from_graph(&hub_graph);
            let origin = resolve(&names, &from)?;
            let destination = resolve(&names, &to)?;

            let search = JourneySearch::new(&hub_graph, SearchConfig::new(penalty, 1));
            match search.search(&origin, &destination)? {
                Some(outcome) => {
                    let route: Vec<String> = outcome
                        .path
                        .iter()
                        .map(|h| hub_graph.hub(h).map_or_else(|| h.to_string(), |n| n.name.clone()))
                        .collect();
                    println!("{} ({} line changes)", outcome.minutes, outcome.line_changes);
                    println!("{}", route.join(" -> "));
                }
                None => println!("No route from {from} to {to}"),
            }
            Ok(())
        }

        Command::Serve {
            graph: path,
            addr,
            penalty,
            meet_budget_ms,
        } => {
            let hub_graph = graph::load(&path)?;
            info!(
                hubs = hub_graph.node_count(),
                edges = hub_graph.edge_count(),
                "Loaded graph"
            );
            let state = AppState::new(hub_graph, SearchConfig {
                transfer_penalty_mins: penalty,
                ..SearchConfig::default()
            })
            .with_meet_budget(Duration::from_millis(meet_budget_ms));
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Hub planner listening on http://{addr}");
            info!("  GET  /health");
            info!("  GET  /api/stations/search?q=");
            info!("  GET  /api/journey-time?from=&to=");
            info!("  POST /api/meet");
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}

async fn build<S: TransitSource>(
    source: S,
    config: PipelineConfig,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let run = Pipeline::new(source, config).run().await?;
    graph::save(&run.graph, output)?;
    info!(
        hubs = run.graph.node_count(),
        edges = run.graph.edge_count(),
        issues = run.issue_count(),
        output = %output.display(),
        "Graph written"
    );
    Ok(())
}

fn resolve(names: &StationNames, query: &str) -> Result<HubId, Box<dyn Error>> {
    match names.resolve(query) {
        NameMatch::Found(hub) => Ok(hub),
        NameMatch::Ambiguous(candidates) => {
            let listed: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} ({})", c.name, c.hub))
                .collect();
            Err(format!("{query:?} is ambiguous: {}", listed.join(", ")).into())
        }
        NameMatch::NotFound => Err(format!("station not found: {query:?}").into()),
    }
}
