//! Resolver config loader (strict parsing).

pub mod schema;

use std::fs;

use waypoint_core::error::{Result, WaypointError};

pub use schema::{LimitsSection, QuotaSection, ResolverConfig};

pub fn load_from_file(path: &str) -> Result<ResolverConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WaypointError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ResolverConfig> {
    let cfg: ResolverConfig = serde_yaml::from_str(s)
        .map_err(|e| WaypointError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
