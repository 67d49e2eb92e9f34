use serde::Deserialize;
use waypoint_core::error::{Result, WaypointError};
use waypoint_core::Rate;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    pub version: u32,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub quota: QuotaSection,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: 1,
            limits: LimitsSection::default(),
            quota: QuotaSection::default(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WaypointError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.limits.validate()?;
        self.quota.validate()?;

        Ok(())
    }
}

/// Bounds applied to policy responses before they reach the dispatch path.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_max_upstreams")]
    pub max_upstreams: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_upstreams: default_max_upstreams(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1024..=64 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(WaypointError::Config(
                "limits.max_body_bytes must be between 1024 and 67108864".into(),
            ));
        }
        if !(1..=4096).contains(&self.max_upstreams) {
            return Err(WaypointError::Config(
                "limits.max_upstreams must be between 1 and 4096".into(),
            ));
        }
        if self.max_tokens > 4096 {
            return Err(WaypointError::Config(
                "limits.max_tokens must be at most 4096".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}
fn default_max_upstreams() -> usize {
    64
}
fn default_max_tokens() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaSection {
    /// Status of quota-exceeded replies.
    #[serde(default = "default_reply_code")]
    pub reply_code: u16,

    /// Rate for tokens whose quota configuration names none.
    #[serde(default)]
    pub default_rate: Option<Rate>,
}

impl Default for QuotaSection {
    fn default() -> Self {
        Self {
            reply_code: default_reply_code(),
            default_rate: None,
        }
    }
}

impl QuotaSection {
    pub fn validate(&self) -> Result<()> {
        if !(400..=599).contains(&self.reply_code) {
            return Err(WaypointError::Config(
                "quota.reply_code must be between 400 and 599".into(),
            ));
        }
        Ok(())
    }
}

fn default_reply_code() -> u16 {
    429
}
