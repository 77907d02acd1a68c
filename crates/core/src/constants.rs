/// Constants used throughout the warden codebase
// Permission codes
pub const WILDCARD_PERMISSION: &str = "*";
pub const PERMISSION_SEPARATOR: char = ':';

// Cache namespaces
pub const DEFAULT_KEY_PREFIX: &str = "principal:permissions";
pub const ROLE_PERMISSIONS_NAMESPACE: &str = "role:permissions";
pub const PERMISSION_CACHE_NAMESPACE: &str = "permission:cache";

// Environment variable names
pub const WARDEN_LOG_VAR: &str = "WARDEN_LOG";
pub const WARDEN_CONFIG_VAR: &str = "WARDEN_CONFIG";
pub const WARDEN_REDIS_URL_VAR: &str = "WARDEN_REDIS_URL";
pub const WARDEN_ENABLE_REDIS_VAR: &str = "WARDEN_ENABLE_REDIS";
pub const WARDEN_BASE_TTL_VAR: &str = "WARDEN_BASE_TTL";
pub const WARDEN_KEY_PREFIX_VAR: &str = "WARDEN_KEY_PREFIX";

// Defaults
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_BASE_TTL_SECS: u64 = 1800;
