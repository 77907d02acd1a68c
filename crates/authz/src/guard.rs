//! Running protected operations behind the gate

use crate::gate::AuthorizationGate;
use std::future::Future;
use std::sync::Arc;
use warden_core::{DenyReason, Principal, Requirement};

/// Why a guarded operation did not run
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The principal lacks what the requirement demands
    #[error("forbidden: {0}")]
    Forbidden(DenyReason),

    /// The decision could not be made
    #[error("authorization unavailable: {0}")]
    Unavailable(#[source] warden_core::Error),
}

impl AccessError {
    /// HTTP-style status for the calling layer: 403 or 503
    pub const fn status(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::Unavailable(_) => 503,
        }
    }
}

/// Authorize, then run `operation` only on Allow
pub async fn guarded<T, F, Fut>(
    gate: &AuthorizationGate,
    principal: &Principal,
    requirement: &Requirement,
    operation: F,
) -> Result<T, AccessError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    match gate.authorize(principal, requirement).await {
        Ok(decision) => match decision.deny_reason() {
            None => Ok(operation().await),
            Some(reason) => Err(AccessError::Forbidden(reason.clone())),
        },
        Err(e) => Err(AccessError::Unavailable(e)),
    }
}

/// A reusable requirement bound to a gate, for wrapping handlers
#[derive(Clone)]
pub struct Guard {
    gate: Arc<AuthorizationGate>,
    requirement: Requirement,
}

impl Guard {
    pub fn new(gate: Arc<AuthorizationGate>, requirement: Requirement) -> Self {
        Self { gate, requirement }
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub async fn check(&self, principal: &Principal) -> Result<(), AccessError> {
        guarded(&self.gate, principal, &self.requirement, || async {}).await
    }

    pub async fn run<T, F, Fut>(&self, principal: &Principal, operation: F) -> Result<T, AccessError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        guarded(&self.gate, principal, &self.requirement, operation).await
    }
}
