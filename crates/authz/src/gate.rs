//! The authorization decision point
//!
//! One call, one transient decision. Permission requirements are evaluated
//! against the resolver's effective set; role requirements read the store's
//! active role names directly and never consult the permission cache.

use crate::resolver::PermissionResolver;
use std::sync::Arc;
use tracing::Instrument;
use warden_cache::CacheMetrics;
use warden_core::{Decision, DenyKind, DenyReason, Principal, PrincipalId, Requirement, Result};
use warden_utils::tracing::authorize_span;
use warden_utils::within;

pub struct AuthorizationGate {
    resolver: Arc<PermissionResolver>,
    metrics: CacheMetrics,
}

impl AuthorizationGate {
    pub fn new(resolver: Arc<PermissionResolver>, metrics: CacheMetrics) -> Self {
        Self { resolver, metrics }
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    /// Decide whether `principal` satisfies `requirement`.
    ///
    /// `Err` means the question could not be answered (store outage,
    /// timeout) and must not be reported as a denial.
    ///
    /// # Panics
    ///
    /// Panics on a malformed requirement: an ALL or ANY list with no codes,
    /// or an empty role name.
    pub async fn authorize(
        &self,
        principal: &Principal,
        requirement: &Requirement,
    ) -> Result<Decision> {
        assert_well_formed(requirement);

        let span = authorize_span(principal.id.as_str(), &requirement.to_string());
        let result = self.evaluate(principal, requirement).instrument(span).await;

        let outcome = match &result {
            Ok(Decision::Allow) => "allow",
            Ok(Decision::Deny(_)) => "deny",
            Err(_) => "error",
        };
        self.metrics.record_decision(outcome);
        match &result {
            Ok(Decision::Deny(reason)) => {
                tracing::debug!(principal = %principal.id, %requirement, "Denied: {}", reason);
            }
            Err(e) => {
                tracing::error!(
                    principal = %principal.id,
                    %requirement,
                    "Authorization undeterminable: {}",
                    e
                );
            }
            Ok(Decision::Allow) => {}
        }
        result
    }

    /// Load the principal from the store, then [`authorize`](Self::authorize)
    pub async fn authorize_id(
        &self,
        principal: &PrincipalId,
        requirement: &Requirement,
    ) -> Result<Decision> {
        assert_well_formed(requirement);
        let principal = match self.resolver.load_principal(principal).await {
            Ok(principal) => principal,
            Err(e) => {
                self.metrics.record_decision("error");
                return Err(e);
            }
        };
        self.authorize(&principal, requirement).await
    }

    async fn evaluate(&self, principal: &Principal, requirement: &Requirement) -> Result<Decision> {
        if principal.is_superuser {
            return Ok(Decision::Allow);
        }
        if !principal.is_active {
            return Ok(Decision::Deny(DenyReason::inactive()));
        }

        match requirement {
            Requirement::Role(name) => self.check_role(principal, name).await,
            Requirement::Single(code) => {
                let permissions = self.resolver.effective_permissions(principal).await?;
                Ok(if permissions.contains(code.as_str()) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::new(
                        DenyKind::MissingPermission,
                        vec![code.to_string()],
                    ))
                })
            }
            Requirement::All(codes) => {
                let permissions = self.resolver.effective_permissions(principal).await?;
                let missing = permissions.missing(codes);
                Ok(if missing.is_empty() {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::new(
                        DenyKind::MissingAllOf,
                        missing.into_iter().map(String::from).collect(),
                    ))
                })
            }
            Requirement::Any(codes) => {
                let permissions = self.resolver.effective_permissions(principal).await?;
                Ok(if codes.iter().any(|code| permissions.contains(code.as_str())) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::new(
                        DenyKind::MissingAnyOf,
                        codes.iter().map(ToString::to_string).collect(),
                    ))
                })
            }
        }
    }

    async fn check_role(&self, principal: &Principal, name: &str) -> Result<Decision> {
        let roles = within(
            "active role names",
            self.resolver.store_deadline(),
            self.resolver.store().active_role_names(&principal.id),
        )
        .await?;
        Ok(if roles.contains(name) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::new(DenyKind::MissingRole, vec![name.to_string()]))
        })
    }
}

fn assert_well_formed(requirement: &Requirement) {
    match requirement {
        Requirement::All(codes) => {
            assert!(!codes.is_empty(), "ALL requirement needs at least one code")
        }
        Requirement::Any(codes) => {
            assert!(!codes.is_empty(), "ANY requirement needs at least one code")
        }
        Requirement::Role(name) => assert!(!name.is_empty(), "ROLE requirement needs a name"),
        Requirement::Single(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::{InMemoryStore, PermissionRecord};
    use proptest::prelude::*;
    use warden_cache::{KeySpace, MemoryBackend, TtlPolicy};
    use warden_config::WardenConfig;
    use warden_core::{PermissionCode, PermissionId};

    const CODES: [&str; 6] = [
        "doc:read",
        "doc:write",
        "doc:delete",
        "report:export",
        "user:manage",
        "admin:delete",
    ];

    fn gate_with_grants(granted: &[usize]) -> (AuthorizationGate, Principal) {
        let store = InMemoryStore::new();
        for (index, code) in CODES.iter().enumerate() {
            store.upsert_permission(PermissionRecord {
                id: PermissionId::new(format!("p{index}")),
                code: PermissionCode::new(*code).unwrap(),
                is_active: true,
            });
        }
        let principal = Principal::new("u");
        store.upsert_principal(principal.clone());
        for index in granted {
            store
                .grant_direct(&principal.id, &PermissionId::new(format!("p{index}")))
                .unwrap();
        }

        let config = WardenConfig::default();
        let resolver = PermissionResolver::new(
            Arc::new(store),
            Arc::new(MemoryBackend::new()),
            Arc::new(TtlPolicy::from_config(&config)),
            KeySpace::new(&config.key_prefix),
        );
        let gate = AuthorizationGate::new(Arc::new(resolver), CacheMetrics::new().unwrap());
        (gate, principal)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn single_requirement() {
        let (gate, principal) = gate_with_grants(&[0]);
        let allowed = gate
            .authorize(&principal, &Requirement::single("doc:read").unwrap())
            .await
            .unwrap();
        assert!(allowed.is_allowed());

        let denied = gate
            .authorize(&principal, &Requirement::single("doc:write").unwrap())
            .await
            .unwrap();
        assert_eq!(
            denied,
            Decision::Deny(DenyReason::new(
                DenyKind::MissingPermission,
                vec!["doc:write".into()]
            ))
        );
        assert_eq!(gate.metrics.decision_count("allow"), 1);
        assert_eq!(gate.metrics.decision_count("deny"), 1);
    }

    #[tokio::test]
    async fn unknown_principal_id_is_an_error() {
        let (gate, _) = gate_with_grants(&[]);
        let err = gate
            .authorize_id(&PrincipalId::new("ghost"), &Requirement::role("admin"))
            .await
            .unwrap_err();
        assert!(err.is_undeterminable());
        assert_eq!(gate.metrics.decision_count("error"), 1);
    }

    proptest! {
        #[test]
        fn all_denies_with_exact_missing_subset(
            granted in proptest::sample::subsequence((0..CODES.len()).collect::<Vec<_>>(), 0..=CODES.len()),
            required in proptest::sample::subsequence((0..CODES.len()).collect::<Vec<_>>(), 1..=CODES.len()),
        ) {
            let (gate, principal) = gate_with_grants(&granted);
            let requirement = Requirement::all(required.iter().map(|i| CODES[*i])).unwrap();
            let decision = runtime().block_on(gate.authorize(&principal, &requirement)).unwrap();

            let expected: Vec<String> = required
                .iter()
                .filter(|i| !granted.contains(i))
                .map(|i| CODES[*i].to_string())
                .collect();
            match decision {
                Decision::Allow => prop_assert!(expected.is_empty()),
                Decision::Deny(reason) => {
                    prop_assert_eq!(reason.kind, DenyKind::MissingAllOf);
                    prop_assert_eq!(reason.missing, expected);
                }
            }
        }

        #[test]
        fn any_allows_iff_some_code_is_granted(
            granted in proptest::sample::subsequence((0..CODES.len()).collect::<Vec<_>>(), 0..=CODES.len()),
            required in proptest::sample::subsequence((0..CODES.len()).collect::<Vec<_>>(), 1..=CODES.len()),
        ) {
            let (gate, principal) = gate_with_grants(&granted);
            let requirement = Requirement::any(required.iter().map(|i| CODES[*i])).unwrap();
            let decision = runtime().block_on(gate.authorize(&principal, &requirement)).unwrap();
            let overlap = required.iter().any(|i| granted.contains(i));
            prop_assert_eq!(decision.is_allowed(), overlap);
        }
    }
}
