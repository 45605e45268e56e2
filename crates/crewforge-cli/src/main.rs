mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::CrewforgeConfig;
use crewforge_agent::ChatExecutor;
use crewforge_core::{ToolSet, WorkflowKind};
use crewforge_gateway::GatewayServer;
use crewforge_orchestrator::graph::{
    AnalysisParams, CreationParams, DiscoveryParams, PipelineParams, WorkflowParams,
};
use crewforge_orchestrator::{
    AutomationJob, AutomationScheduler, FallbackController, HealthGate, LogNotifier, MemoryStore,
    Orchestrator, Scheduler, WebhookFallback, WorkerRegistry, WorkflowStore,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crewforge", about = "Content pipeline orchestrator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "crewforge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway and the automation scheduler
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Serve HTTP only, without scheduled jobs
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one workflow and print its result as JSON
    Run {
        /// discovery, creation, performance_analysis or full_pipeline
        workflow: WorkflowKind,
        #[arg(long, value_delimiter = ',')]
        platforms: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        niches: Vec<String>,
        /// Trend data for creation, as JSON
        #[arg(long)]
        trend_data: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,
        /// Entity for the full pipeline
        #[arg(long, default_value = "cli")]
        entity_id: String,
        /// Campaign configuration for the full pipeline, as JSON
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Inspect scheduled jobs
    Schedule {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Inspect the worker registry
    Workers {
        #[command(subcommand)]
        action: ListAction,
    },
}

#[derive(Subcommand)]
enum ListAction {
    /// List entries
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = CrewforgeConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_scheduler,
        } => serve(config, host, port, no_scheduler).await?,
        Commands::Run {
            workflow,
            platforms,
            niches,
            trend_data,
            content_type,
            period,
            metrics,
            entity_id,
            campaign,
        } => {
            let params = match workflow {
                WorkflowKind::Discovery => WorkflowParams::Discovery(DiscoveryParams::new(
                    non_empty(platforms),
                    non_empty(niches),
                )),
                WorkflowKind::Creation => WorkflowParams::Creation(CreationParams::new(
                    parse_json_arg("--trend-data", trend_data)?,
                    content_type,
                )),
                WorkflowKind::PerformanceAnalysis => WorkflowParams::PerformanceAnalysis(
                    AnalysisParams::new(period, non_empty(metrics)),
                ),
                WorkflowKind::FullPipeline => WorkflowParams::FullPipeline(PipelineParams {
                    entity_id,
                    campaign_config: parse_json_arg("--campaign", campaign)?,
                }),
            };
            let orchestrator = build_orchestrator(&config)?;
            let result = orchestrator.run(params).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Schedule {
            action: ListAction::List,
        } => {
            println!("Scheduled jobs:");
            for job in AutomationJob::ALL {
                let next = Scheduler::next_fire_time(job.cron_expression())?;
                println!(
                    "  {:<24} {:<18} next: {}",
                    job.as_str(),
                    job.cron_expression(),
                    next.to_rfc3339()
                );
            }
            if !config.features.ai_workflows_enabled {
                println!("\nAI workflows are disabled; `serve` will not start these jobs.");
            }
        }
        Commands::Workers {
            action: ListAction::List,
        } => {
            let registry = build_registry(&config)?;
            println!("Registered workers ({:?} mode):", config.features.tool_mode());
            for worker in registry.workers() {
                let profile = worker.profile();
                let tools: Vec<&str> = profile.tools.iter().map(|t| t.name.as_str()).collect();
                println!("  {}: {}", profile.role, profile.title);
                println!(
                    "    max_iterations: {}, max_retries: {}",
                    profile.max_iterations, profile.max_retries
                );
                println!("    tools: {}", tools.join(", "));
            }
            println!("\nTotal: {} worker(s)", registry.len());
        }
    }

    Ok(())
}

async fn serve(
    config: CrewforgeConfig,
    host: Option<String>,
    port: Option<u16>,
    no_scheduler: bool,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    let scheduler = if no_scheduler || !config.features.ai_workflows_enabled {
        info!("Automation scheduler not started");
        None
    } else {
        let store: Arc<dyn WorkflowStore> = Arc::new(MemoryStore::new());
        let automation = Arc::new(AutomationScheduler::new(
            orchestrator.clone(),
            store,
            Arc::new(LogNotifier),
            fallback_controller(&config),
            config.scheduler.to_automation(),
        ));
        Some(Scheduler::new(automation.scheduled_jobs()?).start())
    };

    info!(%addr, "Starting crewforge gateway");
    tokio::select! {
        served = GatewayServer::serve(orchestrator, addr) => served?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}

fn build_registry(config: &CrewforgeConfig) -> anyhow::Result<WorkerRegistry> {
    let tools = ToolSet::standard(config.features.tool_mode(), &config.services.crew_tools_url);
    let executor = Arc::new(ChatExecutor::new(config.model.clone())?);
    Ok(WorkerRegistry::create_workers(&tools, executor)?)
}

fn build_orchestrator(config: &CrewforgeConfig) -> anyhow::Result<Orchestrator> {
    Ok(Orchestrator::with_max_rpm(
        build_registry(config)?,
        HealthGate::http(),
        config.services.dependencies(),
        config.services.max_rpm,
    ))
}

fn fallback_controller(config: &CrewforgeConfig) -> FallbackController {
    let urls = &config.fallbacks;
    [
        (AutomationJob::TrendDiscovery, &urls.trend_discovery),
        (AutomationJob::ContentCreation, &urls.content_creation),
        (AutomationJob::PerformanceAnalysis, &urls.performance_analysis),
    ]
    .into_iter()
    .fold(
        FallbackController::new(config.features.fallback_enabled),
        |controller, (job, url)| {
            let Some(url) = url else {
                return controller;
            };
            match WebhookFallback::new(format!("traditional_{job}"), url.clone()) {
                Ok(routine) => controller.with_routine(job, Arc::new(routine)),
                Err(e) => {
                    warn!(job = %job, error = %e, "Skipping fallback routine");
                    controller
                }
            }
        },
    )
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn parse_json_arg(flag: &str, raw: Option<String>) -> anyhow::Result<serde_json::Value> {
    match raw {
        Some(raw) => serde_json::from_str(&raw).with_context(|| format!("{flag} is not valid JSON")),
        None => Ok(serde_json::json!({})),
    }
}
