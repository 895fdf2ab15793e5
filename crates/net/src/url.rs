//! The `OpenRTI` address scheme (§6.3): `scheme://host[:service][/federation-name]`,
//! plus the legacy bare-path and `pipe://`/`file://`/`thread://`/`trace://`
//! forms. Query and fragment use `OpenRTI`'s own percent-codec rather than
//! the `url` crate's, since the two differ subtly on reserved characters
//! (see `DESIGN.md`); the `url` crate is reused only to split the
//! `rti://host:port/path` authority, which it does exactly right.

use crate::error::TransportError;

pub const DEFAULT_RTI_PORT: u16 = 14321;
pub const DEFAULT_PIPE_PATH: &str = ".OpenRTI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `rti://host[:port]`, TCP.
    Rti,
    /// `pipe://path`, `file://path`, or a bare path, local IPC.
    Pipe,
    /// `thread://name`, in-process.
    Thread,
    /// `trace://wrapped`, a diagnostic wrapper around another address.
    Trace,
    /// `http://...`, reserved, not implemented.
    Http,
}

impl Scheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rti => "rti",
            Self::Pipe => "pipe",
            Self::Thread => "thread",
            Self::Trace => "trace",
            Self::Http => "http",
        }
    }
}

/// A parsed `OpenRTI` address. `host`/`port` are only meaningful for
/// [`Scheme::Rti`]; `path` carries the pipe path or thread/federation name
/// for the other schemes. `wrapped` is set only for [`Scheme::Trace`].
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub scheme: Scheme,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub fragment: Option<String>,
    pub wrapped: Option<Box<Address>>,
}

impl Address {
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.as_bytes() {
        if is_unreserved(*b) {
            out.push(*b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn parse_query(q: &str) -> Vec<(String, String)> {
    q.split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a trailing `#fragment` then a `?query` off `s`, percent-decoding
/// both. Returns `(path_or_authority, query, fragment)`.
fn split_query_fragment(s: &str) -> (&str, Vec<(String, String)>, Option<String>) {
    let (rest, fragment) = match s.split_once('#') {
        Some((head, tail)) => (head, Some(percent_decode(tail))),
        None => (s, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((head, tail)) => (head, parse_query(tail)),
        None => (rest, Vec::new()),
    };
    (path, query, fragment)
}

fn parse_rti(remainder: &str) -> Result<Address, TransportError> {
    let (authority_and_path, query, fragment) = split_query_fragment(remainder);
    let full = format!("rti://{authority_and_path}");
    let url = url::Url::parse(&full)
        .map_err(|e| TransportError::other(format!("invalid rti:// address: {e}")))?;
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string());
    let port = url.port().or(Some(DEFAULT_RTI_PORT));
    let path = percent_decode(url.path().trim_start_matches('/'));
    Ok(Address {
        scheme: Scheme::Rti,
        host,
        port,
        path,
        query,
        fragment,
        wrapped: None,
    })
}

fn parse_opaque(scheme: Scheme, remainder: &str) -> Address {
    let (path, query, fragment) = split_query_fragment(remainder);
    let path = if path.is_empty() {
        match scheme {
            Scheme::Pipe => DEFAULT_PIPE_PATH.to_string(),
            _ => String::new(),
        }
    } else {
        percent_decode(path)
    };
    Address {
        scheme,
        host: None,
        port: None,
        path,
        query,
        fragment,
        wrapped: None,
    }
}

/// Parses an `OpenRTI` address string (§6.3).
pub fn parse(input: &str) -> Result<Address, TransportError> {
    if let Some(rest) = input.strip_prefix("trace://") {
        let inner = parse(rest)?;
        return Ok(Address {
            scheme: Scheme::Trace,
            host: None,
            port: None,
            path: String::new(),
            query: Vec::new(),
            fragment: None,
            wrapped: Some(Box::new(inner)),
        });
    }
    if let Some(rest) = input.strip_prefix("rti://") {
        return parse_rti(rest);
    }
    if let Some(rest) = input.strip_prefix("pipe://") {
        return Ok(parse_opaque(Scheme::Pipe, rest));
    }
    if let Some(rest) = input.strip_prefix("file://") {
        return Ok(parse_opaque(Scheme::Pipe, rest));
    }
    if let Some(rest) = input.strip_prefix("thread://") {
        return Ok(parse_opaque(Scheme::Thread, rest));
    }
    if let Some(rest) = input.strip_prefix("http://") {
        return Ok(parse_opaque(Scheme::Http, rest));
    }
    if input.contains("://") {
        let scheme = input.split("://").next().unwrap_or_default();
        return Err(TransportError::other(format!(
            "unknown url scheme `{scheme}`"
        )));
    }
    // Bare path: the named-pipe-equivalent default.
    Ok(parse_opaque(Scheme::Pipe, input))
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(wrapped) = &self.wrapped {
            return write!(f, "trace://{wrapped}");
        }
        match self.scheme {
            Scheme::Rti => {
                write!(f, "rti://")?;
                write!(f, "{}", self.host.as_deref().unwrap_or("localhost"))?;
                if let Some(port) = self.port {
                    if port != DEFAULT_RTI_PORT {
                        write!(f, ":{port}")?;
                    }
                }
                if !self.path.is_empty() {
                    write!(f, "/{}", percent_encode(&self.path))?;
                }
            }
            Scheme::Pipe | Scheme::Thread | Scheme::Http => {
                write!(f, "{}://{}", self.scheme.as_str(), self.path)?;
            }
            Scheme::Trace => unreachable!("handled above"),
        }
        if !self.query.is_empty() {
            write!(f, "?{}", encode_query(&self.query))?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", percent_encode(fragment))?;
        }
        Ok(())
    }
}
