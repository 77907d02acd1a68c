#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_authz::{InMemoryStore, PermissionStore, Warden};
use warden_cache::{BackendKind, CacheBackend, KeyTtl, MemoryBackend, Removal};
use warden_config::{TimeoutConfig, WardenConfig};
use warden_core::{
    Error, PermissionCode, PermissionId, Principal, PrincipalId, Result, RoleId,
};

/// Principal `u` with direct `report:export` and role `editor`
/// granting `doc:read` and `doc:write`
pub const FIXTURE: &str = r#"{
    "permissions": [
        { "id": "p-export", "code": "report:export" },
        { "id": "p-read", "code": "doc:read" },
        { "id": "p-write", "code": "doc:write" },
        { "id": "p-delete", "code": "admin:delete" }
    ],
    "roles": [
        { "id": "editor", "name": "editor", "permissions": ["p-read", "p-write"] },
        { "id": "auditor", "name": "auditor", "permissions": ["p-read"] }
    ],
    "principals": [
        { "id": "u", "username": "una", "roles": ["editor"], "permissions": ["p-export"] },
        { "id": "v", "username": "vic", "roles": ["editor", "auditor"] },
        { "id": "w", "username": "wes", "roles": ["auditor"] },
        { "id": "root", "username": "root", "is_superuser": true },
        { "id": "gone", "username": "gone", "is_active": false, "roles": ["editor"] }
    ]
}"#;

pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_json(FIXTURE).unwrap())
}

pub fn config() -> WardenConfig {
    WardenConfig::builder()
        .with_timeouts(TimeoutConfig {
            cache_ms: 100,
            probe_ms: 50,
            store_ms: 200,
        })
        .build()
        .unwrap()
}

pub fn warden(store: Arc<dyn PermissionStore>, primary: Arc<dyn CacheBackend>) -> Warden {
    Warden::builder(store)
        .config(config())
        .primary(primary)
        .build()
        .unwrap()
}

pub async fn principal(store: &InMemoryStore, id: &str) -> Principal {
    store.get_principal(&PrincipalId::new(id)).await.unwrap()
}

/// A primary that counts every call and can be switched off
pub struct InstrumentedBackend {
    inner: MemoryBackend,
    up: AtomicBool,
    calls: AtomicUsize,
    pings: AtomicUsize,
    /// Keys whose delete hangs forever
    stuck: parking_lot::Mutex<HashSet<String>>,
}

impl InstrumentedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            up: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            stuck: parking_lot::Mutex::new(HashSet::new()),
        })
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    /// Calls other than health probes
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn stick(&self, key: &str) {
        self.stuck.lock().insert(key.to_string());
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    fn enter(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.up.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for InstrumentedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn get(&self, key: &str) -> Option<String> {
        if !self.enter() {
            return None;
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        self.enter() && self.inner.set(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> bool {
        if !self.enter() {
            return false;
        }
        let stuck = self.stuck.lock().contains(key);
        if stuck {
            std::future::pending::<()>().await;
        }
        self.inner.delete(key).await
    }

    async fn remove(&self, key: &str) -> Removal {
        if !self.up.load(Ordering::SeqCst) {
            self.enter();
            return Removal::Failed;
        }
        if self.delete(key).await {
            Removal::Removed
        } else {
            Removal::Absent
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        self.enter() && self.inner.expire(key, ttl_secs).await
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        if !self.enter() {
            return 0;
        }
        self.inner.delete_pattern(pattern).await
    }

    async fn ttl(&self, key: &str) -> KeyTtl {
        if !self.enter() {
            return KeyTtl::Missing;
        }
        self.inner.ttl(key).await
    }

    async fn clear_all(&self) -> bool {
        self.enter() && self.inner.clear_all().await
    }

    async fn ping(&self) -> bool {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.up.load(Ordering::SeqCst)
    }

    async fn key_count(&self) -> u64 {
        if !self.enter() {
            return 0;
        }
        self.inner.key_count().await
    }
}

/// A backend that answers its health probe but fails every operation
pub struct BrokenBackend;

#[async_trait]
impl CacheBackend for BrokenBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }
    async fn get(&self, _: &str) -> Option<String> {
        None
    }
    async fn set(&self, _: &str, _: &str, _: u64) -> bool {
        false
    }
    async fn delete(&self, _: &str) -> bool {
        false
    }
    async fn remove(&self, _: &str) -> Removal {
        Removal::Failed
    }
    async fn expire(&self, _: &str, _: u64) -> bool {
        false
    }
    async fn delete_pattern(&self, _: &str) -> u64 {
        0
    }
    async fn ttl(&self, _: &str) -> KeyTtl {
        KeyTtl::Missing
    }
    async fn clear_all(&self) -> bool {
        false
    }
    async fn ping(&self) -> bool {
        true
    }
    async fn key_count(&self) -> u64 {
        0
    }
}

/// How a wrapped store misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Down,
    Hang,
}

/// Wraps a store, injecting faults into grant reads
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    fault: parking_lot::Mutex<Fault>,
    grant_reads: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fault: parking_lot::Mutex::new(Fault::None),
            grant_reads: AtomicUsize::new(0),
        })
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    pub fn grant_reads(&self) -> usize {
        self.grant_reads.load(Ordering::SeqCst)
    }

    async fn check(&self, operation: &str) -> Result<()> {
        let fault = *self.fault.lock();
        match fault {
            Fault::None => Ok(()),
            Fault::Down => Err(Error::store_unavailable(operation, "connection refused")),
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PermissionStore for FaultyStore {
    async fn get_principal(&self, principal: &PrincipalId) -> Result<Principal> {
        self.inner.get_principal(principal).await
    }

    async fn direct_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>> {
        self.grant_reads.fetch_add(1, Ordering::SeqCst);
        self.check("direct grants").await?;
        self.inner.direct_grants(principal).await
    }

    async fn role_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>> {
        self.check("role grants").await?;
        self.inner.role_grants(principal).await
    }

    async fn principals_by_role(&self, role: &RoleId) -> Result<Vec<PrincipalId>> {
        self.check("principals by role").await?;
        self.inner.principals_by_role(role).await
    }

    async fn principals_by_permission(
        &self,
        permission: &PermissionId,
    ) -> Result<Vec<PrincipalId>> {
        self.check("principals by permission").await?;
        self.inner.principals_by_permission(permission).await
    }

    async fn active_role_names(&self, principal: &PrincipalId) -> Result<BTreeSet<String>> {
        self.check("active role names").await?;
        self.inner.active_role_names(principal).await
    }
}

pub fn codes(set: &warden_core::PermissionSet) -> Vec<String> {
    set.to_strings()
}
