//! Upstream descriptors (validated backend targets).
//!
//! An upstream can arrive in three shapes, all normalized to the same
//! `Upstream`:
//! - a pre-parsed `url::Url`,
//! - a string, validated as a URL first,
//! - a structured map (`scheme`, `host`, `port`, `rewrite-path`, headers).

use std::fmt;

use serde_json::{Map, Value};
use url::Url;

use crate::error::{Result, WaypointError};
use crate::headers::{add_remove_headers, HeaderSet};
use crate::value::{optional_str, required_integer, required_str, type_name};

/// Upstream URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Exact-match parse; anything other than `http`/`https` is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "" => Err(WaypointError::validation("expected scheme")),
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(WaypointError::validation(format!("unsupported scheme: {other}"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped upstream source, decoded by runtime shape.
#[derive(Debug, Clone, Copy)]
pub enum UpstreamSource<'a> {
    Url(&'a Url),
    Str(&'a str),
    Map(&'a Map<String, Value>),
}

impl<'a> UpstreamSource<'a> {
    /// Classify a JSON value. Only strings and maps are valid shapes.
    pub fn from_value(v: &'a Value) -> Result<Self> {
        match v {
            Value::String(s) => Ok(UpstreamSource::Str(s)),
            Value::Object(obj) => Ok(UpstreamSource::Map(obj)),
            other => Err(WaypointError::schema(format!(
                "upstream: unsupported type {}",
                type_name(other)
            ))),
        }
    }
}

/// A single backend target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    host: String,
    port: i64,
    rewrite_path: String,
    add_headers: HeaderSet,
    remove_headers: HeaderSet,
}

impl Upstream {
    /// Build an upstream; `scheme` must be exactly `http` or `https`.
    pub fn new(
        scheme: &str,
        host: impl Into<String>,
        port: i64,
        rewrite_path: impl Into<String>,
        add_headers: HeaderSet,
        remove_headers: HeaderSet,
    ) -> Result<Self> {
        Ok(Self {
            scheme: Scheme::parse(scheme)?,
            host: host.into(),
            port,
            rewrite_path: rewrite_path.into(),
            add_headers,
            remove_headers,
        })
    }

    pub fn from_source(src: UpstreamSource<'_>) -> Result<Self> {
        match src {
            UpstreamSource::Url(u) => Self::from_url(u),
            UpstreamSource::Str(s) => Self::from_str_url(s),
            UpstreamSource::Map(obj) => Self::from_map(obj),
        }
    }

    /// Decode any accepted JSON shape.
    pub fn from_value(v: &Value) -> Result<Self> {
        Self::from_source(UpstreamSource::from_value(v)?)
    }

    /// From a parsed URL. The URL must carry a host and an explicit port.
    ///
    /// `Url` drops a port equal to the scheme default, so `http://h:80` and
    /// `https://h:443` are rejected here like any URL without a port; give
    /// such upstreams in the map form. A bare `/` path means no rewrite.
    pub fn from_url(u: &Url) -> Result<Self> {
        let host = u
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| WaypointError::parse(format!("expected host and port in {u}")))?;
        let port = u
            .port()
            .ok_or_else(|| WaypointError::parse(format!("expected host and port in {u}")))?;
        let rewrite_path = match u.path() {
            "/" => "",
            path => path,
        };
        Self::new(
            u.scheme(),
            host,
            i64::from(port),
            rewrite_path,
            HeaderSet::new(),
            HeaderSet::new(),
        )
    }

    /// From a URL string: validated as a URL, then built by [`Upstream::from_url`].
    pub fn from_str_url(s: &str) -> Result<Self> {
        let parsed =
            Url::parse(s).map_err(|e| WaypointError::parse(format!("invalid url {s:?}: {e}")))?;
        Self::from_url(&parsed)
    }

    /// From the structured map form.
    pub fn from_map(obj: &Map<String, Value>) -> Result<Self> {
        let scheme = required_str(obj, "scheme")?;
        let host = required_str(obj, "host")?;
        let port = required_integer(obj, "port")?;
        let rewrite_path = optional_str(obj, "rewrite-path")?.unwrap_or("");
        let (add_headers, remove_headers) = add_remove_headers(obj)?;
        Self::new(scheme, host, port, rewrite_path, add_headers, remove_headers)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> i64 {
        self.port
    }

    pub fn rewrite_path(&self) -> &str {
        &self.rewrite_path
    }

    pub fn add_headers(&self) -> &HeaderSet {
        &self.add_headers
    }

    pub fn remove_headers(&self) -> &HeaderSet {
        &self.remove_headers
    }

    /// Base URL `scheme://host:port` for the transport layer.
    pub fn url(&self) -> Result<Url> {
        let s = format!("{}://{}:{}", self.scheme, self.host, self.port);
        Url::parse(&s).map_err(|e| WaypointError::parse(format!("invalid upstream url {s}: {e}")))
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Url({}://{}:{})", self.scheme, self.host, self.port)
    }
}
