use crate::output::print_json;
use clap::Args;
use eyre::{eyre, Result};
use serde_json::json;
use warden_authz::Warden;
use warden_core::{PrincipalId, Requirement};

/// Exactly one requirement form
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct RequirementArgs {
    /// One permission code, e.g. report:export
    #[arg(long, value_name = "CODE")]
    permission: Option<String>,

    /// Every listed code is required (comma separated)
    #[arg(long, value_name = "CODES", value_delimiter = ',', num_args = 1..)]
    all: Vec<String>,

    /// At least one listed code is required (comma separated)
    #[arg(long, value_name = "CODES", value_delimiter = ',', num_args = 1..)]
    any: Vec<String>,

    /// Membership of an active role, by name
    #[arg(long, value_name = "NAME")]
    role: Option<String>,
}

impl RequirementArgs {
    pub fn requirement(&self) -> Result<Requirement> {
        if let Some(code) = &self.permission {
            return Ok(Requirement::single(code)?);
        }
        if !self.all.is_empty() {
            return Ok(Requirement::all(self.all.iter().map(String::as_str))?);
        }
        if !self.any.is_empty() {
            return Ok(Requirement::any(self.any.iter().map(String::as_str))?);
        }
        match &self.role {
            Some(name) if !name.trim().is_empty() => Ok(Requirement::role(name.trim())),
            _ => Err(eyre!("a requirement needs a permission, a code list or a role name")),
        }
    }

    pub async fn execute(self, principal: &PrincipalId, warden: &Warden) -> Result<()> {
        let requirement = self.requirement()?;
        let decision = warden.gate().authorize_id(principal, &requirement).await?;
        if !decision.is_allowed() {
            tracing::info!(%principal, %requirement, "Access denied");
        }
        print_json(&json!({
            "principal": principal,
            "requirement": requirement.to_string(),
            "allowed": decision.is_allowed(),
            "result": decision,
        }))
    }
}
