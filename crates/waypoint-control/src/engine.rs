//! Decision engine: the dispatch path's entry point.
//!
//! Takes the raw policy response body, applies the configured bounds, and
//! hands back a validated `Directive`. Built once from config and shared by
//! reference; it holds no mutable state.

use std::time::SystemTime;

use serde_json::{json, Value};

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::{Directive, Rate, Reply, Resolver};

use crate::config::ResolverConfig;

pub struct DecisionEngine {
    cfg: ResolverConfig,
    resolver: Resolver,
}

impl DecisionEngine {
    /// Engine with passthrough token/failover parsers.
    pub fn new(cfg: ResolverConfig) -> Self {
        Self::with_resolver(cfg, Resolver::default())
    }

    pub fn with_resolver(cfg: ResolverConfig, resolver: Resolver) -> Self {
        Self { cfg, resolver }
    }

    pub fn cfg(&self) -> &ResolverConfig {
        &self.cfg
    }

    /// Configured fallback rate, if any.
    pub fn default_rate(&self) -> Option<&Rate> {
        self.cfg.quota.default_rate.as_ref()
    }

    /// Decode and resolve a policy response body.
    pub fn decide_bytes(&self, body: &[u8]) -> Result<Directive> {
        let res = self.decode(body).and_then(|v| self.resolve_bounded(&v));
        self.observe(res)
    }

    /// Resolve an already-decoded policy response.
    pub fn decide_value(&self, v: &Value) -> Result<Directive> {
        self.observe(self.resolve_bounded(v))
    }

    /// Reply for a token that exhausted `rate` in the current bucket.
    pub fn quota_exceeded(&self, rate: &Rate, now: SystemTime) -> Result<Reply> {
        let retry = rate.retry_seconds(now);
        tracing::debug!(%rate, retry_seconds = retry, "quota exceeded");
        Reply::new(
            i64::from(self.cfg.quota.reply_code),
            json!({ "error": "quota exceeded", "retry-seconds": retry }),
        )
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        let max = self.cfg.limits.max_body_bytes;
        if body.len() > max {
            return Err(WaypointError::Validation(format!(
                "policy response too large: {} bytes (max {max})",
                body.len()
            )));
        }
        serde_json::from_slice(body)
            .map_err(|e| WaypointError::Parse(format!("policy response is not valid json: {e}")))
    }

    fn resolve_bounded(&self, v: &Value) -> Result<Directive> {
        let directive = self.resolver.resolve(v)?;
        if let Directive::Forward(fw) = &directive {
            let limits = &self.cfg.limits;
            if fw.upstreams().len() > limits.max_upstreams {
                return Err(WaypointError::Validation(format!(
                    "too many upstreams: {} (max {})",
                    fw.upstreams().len(),
                    limits.max_upstreams
                )));
            }
            if fw.tokens().len() > limits.max_tokens {
                return Err(WaypointError::Validation(format!(
                    "too many tokens: {} (max {})",
                    fw.tokens().len(),
                    limits.max_tokens
                )));
            }
        }
        Ok(directive)
    }

    fn observe(&self, res: Result<Directive>) -> Result<Directive> {
        match &res {
            Ok(Directive::Reply(r)) => {
                tracing::debug!(kind = "reply", code = r.code(), "policy resolved");
            }
            Ok(Directive::Forward(fw)) => {
                tracing::debug!(
                    kind = "forward",
                    upstreams = fw.upstreams().len(),
                    tokens = fw.tokens().len(),
                    failover = fw.failover().is_some(),
                    "policy resolved"
                );
            }
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), error = %e, "policy response rejected");
            }
        }
        res
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn quota_reply_carries_retry() {
        let engine = DecisionEngine::new(ResolverConfig::default());
        let rate: Rate = "10/minute".parse().unwrap();
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_123);
        let reply = engine.quota_exceeded(&rate, now).unwrap();
        assert_eq!(reply.code(), 429);
        assert_eq!(reply.message()["retry-seconds"], 37);
    }

    #[test]
    fn body_limit_applies_before_decoding() {
        let mut cfg = ResolverConfig::default();
        cfg.limits.max_body_bytes = 1024;
        let engine = DecisionEngine::new(cfg);
        let body = vec![b' '; 2048];
        let e = engine.decide_bytes(&body).unwrap_err();
        assert!(matches!(e, WaypointError::Validation(_)));
    }
}
