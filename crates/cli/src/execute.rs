use crate::commands::Commands;
use eyre::{Result, WrapErr};
use std::path::Path;
use std::sync::Arc;
use warden_authz::{InMemoryStore, PermissionStore, Warden};
use warden_config::ConfigLoader;

/// Load configuration and the store fixture, then wire the subsystem
pub fn build_warden(config: Option<&Path>, fixture: Option<&Path>) -> Result<Warden> {
    let loader = match config {
        Some(path) => ConfigLoader::new().file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().wrap_err("failed to load configuration")?;

    let store: Arc<dyn PermissionStore> = match fixture {
        Some(path) => Arc::new(
            InMemoryStore::load(path)
                .wrap_err_with(|| format!("failed to load store fixture '{}'", path.display()))?,
        ),
        None => Arc::new(InMemoryStore::new()),
    };

    Ok(Warden::builder(store).config(config).build()?)
}

pub async fn execute_command(command: Commands, warden: &Warden) -> Result<()> {
    command.execute(warden).await
}
