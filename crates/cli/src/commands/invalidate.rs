use crate::output::print_json;
use clap::Subcommand;
use eyre::Result;
use serde_json::json;
use warden_authz::{InvalidationTarget, Warden};
use warden_core::{PermissionId, PrincipalId, RoleId};

#[derive(Subcommand)]
pub enum InvalidateCommands {
    /// Drop one principal's cached permissions
    Principal { id: String },
    /// Drop the entries of every member of a role
    Role { id: String },
    /// Drop the entries of every principal holding a permission
    Permission { id: String },
    /// Drop every cached principal entry
    All,
}

impl InvalidateCommands {
    pub fn target(&self) -> InvalidationTarget {
        match self {
            InvalidateCommands::Principal { id } => {
                InvalidationTarget::Principal(PrincipalId::new(id.as_str()))
            }
            InvalidateCommands::Role { id } => InvalidationTarget::Role(RoleId::new(id.as_str())),
            InvalidateCommands::Permission { id } => {
                InvalidationTarget::Permission(PermissionId::new(id.as_str()))
            }
            InvalidateCommands::All => InvalidationTarget::All,
        }
    }

    pub async fn execute(self, warden: &Warden) -> Result<()> {
        let target = self.target();
        let report = warden.invalidation().invalidate(&target).await?;
        if !report.is_complete() {
            tracing::warn!(
                "{} of {} deletes did not complete; those entries expire with their TTL",
                report.failed,
                report.attempted
            );
        }
        print_json(&json!({
            "scope": target.scope(),
            "target": target.to_string(),
            "report": report,
        }))
    }
}
