//! Directive resolution: untyped policy response -> `Reply` or `Forward`.
//!
//! Dispatch rule: a mapping with a `code` key is a reply, anything else is a
//! forward. The first validation failure aborts resolution; no partial
//! directive is ever returned.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Result, WaypointError};
use crate::handles::{Failover, FailoverParser, PassthroughParser, Token, TokenParser};
use crate::headers::{add_remove_headers, HeaderSet};
use crate::upstream::Upstream;
use crate::value::{as_integer, type_name};

/// Resolved policy decision.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Answer the client directly.
    Reply(Reply),
    /// Route the request to one of the upstreams.
    Forward(Forward),
}

impl Directive {
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Reply(_) => "reply",
            Directive::Forward(_) => "forward",
        }
    }
}

/// Terminal directive: status code plus JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    code: u16,
    message: Value,
}

impl Reply {
    pub fn new(code: i64, message: Value) -> Result<Self> {
        let code = u16::try_from(code)
            .map_err(|_| WaypointError::validation(format!("proper HTTP code is required, got {code}")))?;
        Ok(Self { code, message })
    }

    /// `code` must be a non-negative integer, `message` any JSON value
    /// (including `null`).
    pub fn from_map(obj: &Map<String, Value>) -> Result<Self> {
        let code = obj
            .get("code")
            .ok_or_else(|| WaypointError::validation("expected code"))?;
        let code = as_integer(code).ok_or_else(|| {
            WaypointError::validation(format!("proper HTTP code is required, got {code}"))
        })?;
        let message = obj
            .get("message")
            .ok_or_else(|| WaypointError::validation("expected message"))?;
        Self::new(code, message.clone())
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &Value {
        &self.message
    }

    /// Response body bytes.
    pub fn body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.message)
            .map_err(|e| WaypointError::validation(format!("message should be json encodable: {e}")))
    }
}

/// Non-terminal directive: tokens, candidate upstreams, optional failover and
/// header mutations.
#[derive(Debug, Clone)]
pub struct Forward {
    failover: Option<Arc<dyn Failover>>,
    tokens: Vec<Arc<dyn Token>>,
    upstreams: Vec<Upstream>,
    add_headers: HeaderSet,
    remove_headers: HeaderSet,
}

impl Forward {
    /// At least one upstream is required.
    pub fn new(
        failover: Option<Arc<dyn Failover>>,
        tokens: Vec<Arc<dyn Token>>,
        upstreams: Vec<Upstream>,
        add_headers: HeaderSet,
        remove_headers: HeaderSet,
    ) -> Result<Self> {
        if upstreams.is_empty() {
            return Err(WaypointError::validation("at least one upstream is required"));
        }
        Ok(Self {
            failover,
            tokens,
            upstreams,
            add_headers,
            remove_headers,
        })
    }

    pub fn from_map(
        obj: &Map<String, Value>,
        failover_parser: &dyn FailoverParser,
        token_parser: &dyn TokenParser,
    ) -> Result<Self> {
        let raw = obj
            .get("upstreams")
            .ok_or_else(|| WaypointError::validation("upstreams are required"))?;
        let raw = raw.as_array().ok_or_else(|| {
            WaypointError::schema(format!("upstreams: expected array, got {}", type_name(raw)))
        })?;
        if raw.is_empty() {
            return Err(WaypointError::validation("upstreams: at least one is required"));
        }
        let upstreams = raw
            .iter()
            .enumerate()
            .map(|(i, u)| {
                Upstream::from_value(u).map_err(|e| prefix_error(e, &format!("upstreams[{i}]")))
            })
            .collect::<Result<Vec<_>>>()?;

        let failover = obj
            .get("failover")
            .map(|f| failover_parser.parse_failover(f))
            .transpose()?;

        let tokens = match obj.get("tokens") {
            Some(t) => token_parser.parse_tokens(t)?,
            None => Vec::new(),
        };

        let (add_headers, remove_headers) = add_remove_headers(obj)?;

        Self::new(failover, tokens, upstreams, add_headers, remove_headers)
    }

    pub fn failover(&self) -> Option<&Arc<dyn Failover>> {
        self.failover.as_ref()
    }

    pub fn tokens(&self) -> &[Arc<dyn Token>] {
        &self.tokens
    }

    /// Candidate upstreams, never empty.
    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    pub fn add_headers(&self) -> &HeaderSet {
        &self.add_headers
    }

    pub fn remove_headers(&self) -> &HeaderSet {
        &self.remove_headers
    }
}

/// Resolves policy responses with pluggable token/failover parsers.
///
/// Holds no mutable state; one instance can serve every request concurrently.
#[derive(Clone)]
pub struct Resolver {
    failover_parser: Arc<dyn FailoverParser>,
    token_parser: Arc<dyn TokenParser>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            failover_parser: Arc::new(PassthroughParser),
            token_parser: Arc::new(PassthroughParser),
        }
    }
}

impl Resolver {
    pub fn new(failover_parser: Arc<dyn FailoverParser>, token_parser: Arc<dyn TokenParser>) -> Self {
        Self {
            failover_parser,
            token_parser,
        }
    }

    pub fn resolve(&self, v: &Value) -> Result<Directive> {
        let obj = v.as_object().ok_or_else(|| {
            WaypointError::schema(format!("expected dictionary, got {}", type_name(v)))
        })?;
        if obj.contains_key("code") {
            tracing::trace!("policy response selects reply");
            Ok(Directive::Reply(Reply::from_map(obj)?))
        } else {
            tracing::trace!("policy response selects forward");
            Ok(Directive::Forward(Forward::from_map(
                obj,
                self.failover_parser.as_ref(),
                self.token_parser.as_ref(),
            )?))
        }
    }
}

/// Resolve with the passthrough token/failover parsers.
pub fn resolve(v: &Value) -> Result<Directive> {
    Resolver::default().resolve(v)
}

fn prefix_error(e: WaypointError, at: &str) -> WaypointError {
    match e {
        WaypointError::Schema(m) => WaypointError::Schema(format!("{at}: {m}")),
        WaypointError::Validation(m) => WaypointError::Validation(format!("{at}: {m}")),
        WaypointError::Parse(m) => WaypointError::Parse(format!("{at}: {m}")),
        WaypointError::Config(m) => WaypointError::Config(format!("{at}: {m}")),
    }
}
