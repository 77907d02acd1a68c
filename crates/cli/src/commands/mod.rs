use crate::output::{print_json, print_text};
use clap::{Args, Subcommand};
use eyre::Result;
use serde_json::json;
use warden_authz::Warden;
use warden_cache::TtlContext;
use warden_config::{ContextFlag, Scenario};
use warden_core::PrincipalId;

pub mod check;
pub mod invalidate;

pub use check::RequirementArgs;
pub use invalidate::InvalidateCommands;

#[derive(Subcommand)]
pub enum Commands {
    /// List cache scenarios with the TTL currently in force
    Scenarios {
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Explain which TTL a scenario gets and why
    Ttl {
        /// Scenario name, e.g. principal_permissions
        scenario: Scenario,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Report which backend is serving
    Health,
    /// Show backend state and the TTL configuration in force
    Stats,
    /// Print metrics in prometheus text format
    Metrics,
    /// Show the remaining lifetime of a cache key
    KeyTtl {
        key: String,
    },
    /// Remove every entry written under a scenario
    ClearScenario {
        scenario: Scenario,
    },
    /// Invalidate cached permissions
    #[command(subcommand)]
    Invalidate(InvalidateCommands),
    /// Show the effective permissions of a principal
    Permissions {
        principal: String,
        /// Recompute from the store and rewrite the cache entry
        #[arg(long)]
        fresh: bool,
    },
    /// Authorize a principal against a requirement
    Check {
        principal: String,
        #[command(flatten)]
        requirement: RequirementArgs,
    },
}

/// Context used to pick a TTL
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Context flag to set, e.g. role_changed; repeatable
    #[arg(long = "flag", value_name = "FLAG")]
    flags: Vec<ContextFlag>,

    /// Local hour to evaluate at instead of the current one
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
    hour: Option<u8>,
}

impl ContextArgs {
    pub fn context(&self) -> TtlContext {
        let base = match self.hour {
            Some(hour) => TtlContext::at_hour(hour),
            None => TtlContext::now(),
        };
        base.with_flags(self.flags.iter().copied())
    }
}

impl Commands {
    pub async fn execute(self, warden: &Warden) -> Result<()> {
        let admin = warden.admin();
        match self {
            Commands::Scenarios { context } => print_json(&admin.scenarios(&context.context())),
            Commands::Ttl { scenario, context } => {
                print_json(&admin.ttl_preview(scenario, &context.context()))
            }
            Commands::Health => print_json(&admin.health().await),
            Commands::Stats => print_json(&admin.stats().await),
            Commands::Metrics => print_text(&admin.metrics_text()),
            Commands::KeyTtl { key } => {
                let ttl = admin.key_ttl(&key).await;
                print_json(&json!({ "key": key, "ttl": ttl.as_seconds() }))
            }
            Commands::ClearScenario { scenario } => {
                let removed = admin.clear_scenario(scenario).await;
                tracing::info!("Cleared {removed} entries for scenario {scenario}");
                print_json(&json!({ "scenario": scenario, "removed": removed }))
            }
            Commands::Invalidate(command) => command.execute(warden).await,
            Commands::Permissions { principal, fresh } => {
                let resolver = warden.resolver();
                let principal = resolver.load_principal(&PrincipalId::new(principal)).await?;
                let permissions = if fresh {
                    resolver.refresh(&principal).await?
                } else {
                    resolver.effective_permissions(&principal).await?
                };
                print_json(&json!({
                    "principal": principal.id,
                    "superuser": principal.is_superuser,
                    "permissions": permissions,
                }))
            }
            Commands::Check {
                principal,
                requirement,
            } => requirement.execute(&PrincipalId::new(principal), warden).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> std::result::Result<Commands, clap::Error> {
        Harness::try_parse_from(std::iter::once("warden").chain(args.iter().copied()))
            .map(|harness| harness.command)
    }

    #[test]
    fn ttl_accepts_flags_and_hour() {
        let Commands::Ttl { scenario, context } = parse(&[
            "ttl",
            "dashboard_data",
            "--flag",
            "real_time",
            "--flag",
            "high_load",
            "--hour",
            "10",
        ])
        .unwrap() else {
            panic!("expected the ttl command");
        };
        assert_eq!(scenario, Scenario::DashboardData);
        let context = context.context();
        assert_eq!(context.hour, 10);
        assert_eq!(
            context.flags.into_iter().collect::<Vec<_>>(),
            vec![ContextFlag::RealTime, ContextFlag::HighLoad]
        );
    }

    #[test]
    fn rejects_unknown_scenarios_and_hours() {
        assert!(parse(&["ttl", "menu"]).is_err());
        assert!(parse(&["scenarios", "--hour", "24"]).is_err());
        assert!(parse(&["scenarios", "--flag", "sunny"]).is_err());
    }
}
