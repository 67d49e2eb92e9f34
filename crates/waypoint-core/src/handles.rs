//! Opaque token and failover handles.
//!
//! Their structure belongs to other subsystems. The core only knows that a
//! forward directive may carry them and passes them through unchanged. Parsing
//! is pluggable; the passthrough parser keeps the raw JSON value as the handle.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, WaypointError};
use crate::value::type_name;

/// Failover policy attached to a forward directive.
pub trait Failover: fmt::Debug + Send + Sync {
    /// Concrete handle, for the subsystem that owns it.
    fn as_any(&self) -> &dyn Any;
}

/// Requester identity used to key quota tracking.
pub trait Token: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Parses the `failover` field of a forward directive.
pub trait FailoverParser: Send + Sync {
    fn parse_failover(&self, raw: &Value) -> Result<Arc<dyn Failover>>;
}

/// Parses the `tokens` field of a forward directive.
pub trait TokenParser: Send + Sync {
    fn parse_tokens(&self, raw: &Value) -> Result<Vec<Arc<dyn Token>>>;
}

/// Failover handle holding the raw policy value.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueFailover(pub Value);

impl Failover for OpaqueFailover {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Token handle holding the raw token value.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueToken(pub Value);

impl Token for OpaqueToken {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Default parser: failover is kept verbatim, tokens must be an array and
/// each element is kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughParser;

impl FailoverParser for PassthroughParser {
    fn parse_failover(&self, raw: &Value) -> Result<Arc<dyn Failover>> {
        Ok(Arc::new(OpaqueFailover(raw.clone())))
    }
}

impl TokenParser for PassthroughParser {
    fn parse_tokens(&self, raw: &Value) -> Result<Vec<Arc<dyn Token>>> {
        let items = raw.as_array().ok_or_else(|| {
            WaypointError::schema(format!("tokens: expected array, got {}", type_name(raw)))
        })?;
        Ok(items
            .iter()
            .map(|t| Arc::new(OpaqueToken(t.clone())) as Arc<dyn Token>)
            .collect())
    }
}
