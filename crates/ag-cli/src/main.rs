//! AdGate CLI
//!
//! Offline tooling for the placement engine: evaluate blocklist decisions,
//! preview placement-id assignment for a scenario, and drive a simulated
//! ad lifecycle end to end.

use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;

use ag_core::{AdType, AdsConfig, Blocklist, PlacementRegistry, RemoteSettings};
use ag_lifecycle::{
    AdError, AdEvent, AdLifecycleController, AdProvider, AdUnitHandle, AnalyticsSink,
    EntitlementError, EntitlementProvider,
};

#[derive(Parser)]
#[command(name = "ag-cli")]
#[command(about = "AdGate placement and policy tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the blocklist against placement ids
    Check {
        /// Remote settings JSON file (provides the blocklist)
        #[arg(short, long)]
        settings: String,

        /// Placement ids to evaluate
        #[arg(required = true)]
        placements: Vec<String>,
    },

    /// Replay a scenario and print the assigned placement ids
    Plan {
        /// Scenario JSON file (route changes and ad calls)
        #[arg(long)]
        scenario: String,

        /// Optional remote settings JSON file
        #[arg(short, long)]
        settings: Option<String>,
    },

    /// Run a scenario through the full lifecycle with a scripted provider
    Run {
        /// Scenario JSON file (route changes and ad calls)
        #[arg(long)]
        scenario: String,

        /// Optional remote settings JSON file
        #[arg(short, long)]
        settings: Option<String>,

        /// Have the scripted provider emit earned-reward for rewarded ads
        #[arg(long)]
        earn_reward: bool,
    },
}

// =============================================================================
// Scenario format
// =============================================================================

#[derive(Deserialize)]
struct Scenario {
    steps: Vec<ScenarioStep>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScenarioStep {
    /// Navigation change, e.g. {"route": "/home"}
    Route(String),
    /// Ad call, e.g. {"call": {"ad_type": "interstitial", "tag": "top"}}
    Call {
        ad_type: AdType,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        unit_id: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            settings,
            placements,
        } => cmd_check(&settings, &placements),
        Commands::Plan { scenario, settings } => cmd_plan(&scenario, settings.as_deref()),
        Commands::Run {
            scenario,
            settings,
            earn_reward,
        } => cmd_run(&scenario, settings.as_deref(), earn_reward),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_settings(path: &str) -> Result<RemoteSettings, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse '{}': {}", path, e))
}

fn load_scenario(path: &str) -> Result<Scenario, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse '{}': {}", path, e))
}

fn cmd_check(settings_path: &str, placements: &[String]) -> Result<(), String> {
    let settings = load_settings(settings_path)?;
    let blocklist = Blocklist::new();
    blocklist.set_patterns(settings.ad_blocklist);

    for placement_id in placements {
        match blocklist.matched(placement_id) {
            Some(hit) => println!(
                "{placement_id}: BLOCKED ({} pattern '{}')",
                hit.tier.as_str(),
                hit.pattern
            ),
            None => println!("{placement_id}: allowed"),
        }
    }

    Ok(())
}

fn cmd_plan(scenario_path: &str, settings_path: Option<&str>) -> Result<(), String> {
    let scenario = load_scenario(scenario_path)?;
    let blocklist = Blocklist::new();
    if let Some(path) = settings_path {
        blocklist.set_patterns(load_settings(path)?.ad_blocklist);
    }

    let registry = PlacementRegistry::new();

    for (step_no, step) in scenario.steps.iter().enumerate() {
        match step {
            ScenarioStep::Route(pathname) => {
                registry.set_route(pathname);
                println!("route -> {}", registry.route());
            }
            ScenarioStep::Call { ad_type, tag, .. } => {
                // Each scenario step is its own call site.
                let caller = tag
                    .clone()
                    .unwrap_or_else(|| format!("step_{step_no}"));
                let placement_id = registry.generate_id_for_caller(*ad_type, &caller);
                let verdict = if blocklist.is_blocked(&placement_id) {
                    "BLOCKED"
                } else {
                    "allowed"
                };
                println!("  {placement_id} ({verdict})");
            }
        }
    }

    Ok(())
}

fn cmd_run(
    scenario_path: &str,
    settings_path: Option<&str>,
    earn_reward: bool,
) -> Result<(), String> {
    let scenario = load_scenario(scenario_path)?;
    let settings = match settings_path {
        Some(path) => load_settings(path)?,
        None => RemoteSettings::default(),
    };

    let controller = AdLifecycleController::new(
        Arc::new(PlacementRegistry::new()),
        Arc::new(Blocklist::new()),
        Arc::new(AdsConfig::new()),
        SimulatedProvider { earn_reward },
        NeverPremium,
    )
    .with_analytics(Arc::new(PrintAnalytics));
    controller.apply_remote_settings(settings);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;

    runtime.block_on(async {
        for (step_no, step) in scenario.steps.iter().enumerate() {
            match step {
                ScenarioStep::Route(pathname) => {
                    controller.set_current_route(pathname);
                    println!("route -> {pathname}");
                }
                ScenarioStep::Call {
                    ad_type,
                    tag,
                    unit_id,
                } => {
                    let tag = Some(
                        tag.clone().unwrap_or_else(|| format!("step_{step_no}")),
                    );
                    let outcome = match ad_type {
                        AdType::Interstitial => {
                            controller.show_interstitial(unit_id.clone(), tag).await
                        }
                        AdType::Rewarded => {
                            controller.show_rewarded(unit_id.clone(), tag).await
                        }
                        other => {
                            println!("  {other}: not a full-screen lifecycle type, skipped");
                            continue;
                        }
                    };
                    println!("  {ad_type} -> {outcome}");
                }
            }
        }
    });

    Ok(())
}

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Provider that plays back a fixed happy-path event sequence.
struct SimulatedProvider {
    earn_reward: bool,
}

struct SimulatedUnit {
    events: Vec<AdEvent>,
}

#[async_trait::async_trait]
impl AdProvider for SimulatedProvider {
    async fn create(
        &self,
        ad_type: AdType,
        unit_id: &str,
    ) -> Result<Box<dyn AdUnitHandle>, AdError> {
        println!("  create {ad_type} unit '{unit_id}'");
        let mut events = vec![AdEvent::Loaded, AdEvent::Opened];
        if ad_type == AdType::Rewarded && self.earn_reward {
            events.push(AdEvent::EarnedReward);
        }
        events.push(AdEvent::Closed);
        events.reverse();
        Ok(Box::new(SimulatedUnit { events }))
    }
}

#[async_trait::async_trait]
impl AdUnitHandle for SimulatedUnit {
    async fn load(&mut self) -> Result<(), AdError> {
        Ok(())
    }

    async fn show(&mut self) -> Result<(), AdError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<AdEvent> {
        self.events.pop()
    }
}

struct NeverPremium;

#[async_trait::async_trait]
impl EntitlementProvider for NeverPremium {
    async fn is_premium(&self) -> Result<bool, EntitlementError> {
        Ok(false)
    }
}

struct PrintAnalytics;

impl AnalyticsSink for PrintAnalytics {
    fn log_event(&self, name: &str, placement_id: &str) {
        println!("  analytics {name} {placement_id}");
    }
}
