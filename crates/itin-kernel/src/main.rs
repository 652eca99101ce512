mod config;
mod wiring;

use clap::{Arg, Command};
use itin_model::{BudgetTier, ChatRequest, CreateItineraryReq, PartySpec};
use tracing_subscriber::EnvFilter;

use crate::config::KernelConfig;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Command::new("itin-kernel")
        .version(itin_orchestrator::VERSION)
        .about("Itinerary orchestration engine: agent pipeline and chat router")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Wire up the orchestrator and block until interrupted")
                .arg(Arg::new("port").long("port").help("Overrides ITIN_PORT for this run")),
        )
        .subcommand(
            Command::new("demo")
                .about("Run one create-then-edit cycle end to end and print a text report")
                .arg(
                    Arg::new("destination")
                        .long("destination")
                        .default_value("Kyoto")
                        .help("Destination city for the demo itinerary"),
                )
                .arg(
                    Arg::new("days")
                        .long("days")
                        .default_value("3")
                        .value_parser(clap::value_parser!(u32))
                        .help("Trip length in days"),
                ),
        )
        .subcommand(Command::new("health").about("Wire up every collaborator and report readiness"));

    let matches = cli.get_matches();

    let exit_code = match matches.subcommand() {
        Some(("serve", args)) => run_serve(args).await,
        Some(("demo", args)) => run_demo(args).await,
        Some(("health", _)) => run_health(),
        _ => 1,
    };

    std::process::exit(exit_code);
}

async fn run_serve(args: &clap::ArgMatches) -> i32 {
    let mut config = KernelConfig::from_env();
    if let Some(port) = args.get_one::<String>("port").and_then(|p| p.parse().ok()) {
        config.port = port;
    }

    let _orchestrator = wiring::build_orchestrator(&config);

    tracing::info!(port = config.port, "itin-kernel listening (no transport wired in this build)");
    println!("itin-kernel: orchestrator ready on port {} (ctrl-c to stop)", config.port);

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("shutdown signal received");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to install shutdown signal handler");
            1
        }
    }
}

/// Runs one full create-then-edit cycle against the fixed-fake
/// collaborators and prints a short text report, mirroring the teacher's
/// `report` subcommand shape.
async fn run_demo(args: &clap::ArgMatches) -> i32 {
    let config = KernelConfig::from_env();
    let orchestrator = wiring::build_orchestrator(&config);

    let destination = args.get_one::<String>("destination").cloned().unwrap_or_else(|| "Kyoto".to_string());
    let days = *args.get_one::<u32>("days").unwrap_or(&3);

    let req = CreateItineraryReq {
        destination: destination.clone(),
        start_date: "2025-11-01".to_string(),
        end_date: format!("2025-11-{:02}", days),
        duration_days: days,
        party: PartySpec { adults: 2, children: 0 },
        budget_tier: BudgetTier::Medium,
        interests: vec!["food".to_string(), "history".to_string()],
        user_id: "demo-user".to_string(),
    };

    let ack = match orchestrator.generate(req).await {
        Ok(ack) => ack,
        Err(err) => {
            tracing::error!(error = %err, "demo pipeline failed");
            return 1;
        }
    };

    let created = match orchestrator.load(&ack.id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::error!("generated itinerary vanished before it could be read back");
            return 1;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to read back the generated itinerary");
            return 1;
        }
    };
    let seeded_nodes: usize = created.days.iter().map(|d| d.nodes.len()).sum();

    // The fixed model client returns an empty string, so this edit attempt
    // classifies as an unparseable response; that is an expected, reported
    // outcome in a build with no real model wired, not a demo failure.
    let chat_response = orchestrator
        .edit_via_chat(ChatRequest {
            itinerary_id: ack.id.clone(),
            message: "move lunch on day 1 an hour later".to_string(),
            auto_apply: true,
        })
        .await;

    println!("Itinerary Demo Report");
    println!("=====================");
    println!();
    println!("Destination: {destination}");
    println!("Itinerary id: {}", ack.id);
    println!("Create status: {}", ack.status);
    println!("Days seeded: {}", created.days.len());
    println!("Nodes seeded: {seeded_nodes}");
    println!();
    println!("Chat edit intent: {:?}", chat_response.intent);
    println!("Chat edit applied: {}", chat_response.applied);
    println!("Chat edit message: {}", chat_response.message);

    0
}

fn run_health() -> i32 {
    let config = KernelConfig::from_env();
    let _orchestrator = wiring::build_orchestrator(&config);

    println!("itin-kernel health");
    println!("==================");
    println!("Document store: ready (in-memory)");
    println!("Event bus: ready");
    println!("Idempotency cache: ready");
    println!("Agent registry: ready (10 agents registered)");
    println!("Model client: fixed fake (no real endpoint wired)");
    println!("Places provider: fixed fake (no real endpoint wired)");
    println!("Payment gateway: declining fake (no real processor wired)");
    0
}
