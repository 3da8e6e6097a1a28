// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint URI decomposition.
//!
//! Accepts `scheme://host[:port]/path[?query]`. Fields wider than
//! [`MAX_FIELD_LEN`] are rejected with [`ParseError::TooLong`]; they are
//! never truncated. No name resolution happens here.

use std::fmt;

use crate::error::{ParseError, UriField};

/// Default CoAP port.
pub const DEFAULT_PORT: u16 = 5683;

/// Maximum width of host, path and query, in bytes.
pub const MAX_FIELD_LEN: usize = 63;

/// Decomposed collector endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUri {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: String,
}

impl EndpointUri {
    /// Parse an endpoint string.
    pub fn parse(uri: &str) -> Result<Self, ParseError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| malformed(uri, "missing '://'"))?;
        if scheme.is_empty()
            || !scheme
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        {
            return Err(malformed(uri, "invalid scheme"));
        }

        // Authority runs up to the first '/' or '?'
        let authority_end = rest.find(|c| c == '/' || c == '?').unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        let (host, port) = split_authority(uri, authority)?;

        let tail = tail.strip_prefix('/').unwrap_or(tail);
        let (path, query) = tail.split_once('?').unwrap_or((tail, ""));

        check_width(UriField::Host, host)?;
        check_width(UriField::Path, path)?;
        check_width(UriField::Query, query)?;

        let parsed = Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            query: query.to_string(),
        };
        log::debug!(
            "Parsed URI - host: {}, port: {}, path: {}, query: {}",
            parsed.host,
            parsed.port,
            parsed.path,
            parsed.query
        );
        Ok(parsed)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path without the leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string verbatim, empty when absent.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// Non-empty path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Non-empty `&`-separated query parameters, in order.
    pub fn query_params(&self) -> impl Iterator<Item = &str> {
        self.query.split('&').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for EndpointUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}/{}", self.scheme, self.host, self.port, self.path)?;
        } else {
            write!(f, "{}://{}:{}/{}", self.scheme, self.host, self.port, self.path)?;
        }
        if self.has_query() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

fn malformed(uri: &str, reason: &str) -> ParseError {
    ParseError::MalformedUri(format!("{} ({})", uri, reason))
}

fn check_width(field: UriField, value: &str) -> Result<(), ParseError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(ParseError::TooLong {
            field,
            len: value.len(),
            max: MAX_FIELD_LEN,
        });
    }
    Ok(())
}

/// Split `host[:port]` or `[v6]:port`.
fn split_authority<'a>(uri: &str, authority: &'a str) -> Result<(&'a str, u16), ParseError> {
    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| malformed(uri, "unterminated IPv6 literal"))?;
        match after {
            "" => (host, None),
            _ => match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(malformed(uri, "unexpected text after IPv6 literal")),
            },
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(malformed(uri, "empty host"));
    }
    if !host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':' | b'%'))
    {
        return Err(malformed(uri, "invalid character in host"));
    }

    let port = match port {
        None => DEFAULT_PORT,
        Some(p) => match p.parse::<u16>() {
            Ok(0) | Err(_) => return Err(malformed(uri, "invalid port")),
            Ok(port) => port,
        },
    };
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_port() {
        let uri = EndpointUri::parse("coap://192.168.1.52:5683/sensor/send-data").unwrap();
        assert_eq!(uri.scheme(), "coap");
        assert_eq!(uri.host(), "192.168.1.52");
        assert_eq!(uri.port(), 5683);
        assert_eq!(uri.path(), "sensor/send-data");
        assert_eq!(uri.query(), "");
        assert!(!uri.has_query());
        assert_eq!(uri.segments().collect::<Vec<_>>(), ["sensor", "send-data"]);
    }

    #[test]
    fn test_parse_default_port() {
        let uri = EndpointUri::parse("coap://10.0.0.5/a").unwrap();
        assert_eq!(uri.host(), "10.0.0.5");
        assert_eq!(uri.port(), DEFAULT_PORT);
        assert_eq!(uri.segments().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_query_split_on_first_question_mark() {
        let uri = EndpointUri::parse("coap://10.0.0.5:7000/a/b?x=1&y=2?z").unwrap();
        assert_eq!(uri.port(), 7000);
        assert_eq!(uri.path(), "a/b");
        assert_eq!(uri.query(), "x=1&y=2?z");
        assert_eq!(uri.query_params().collect::<Vec<_>>(), ["x=1", "y=2?z"]);
    }

    #[test]
    fn test_query_without_path() {
        let uri = EndpointUri::parse("coap://10.0.0.5?k=v").unwrap();
        assert_eq!(uri.path(), "");
        assert_eq!(uri.query(), "k=v");
        assert_eq!(uri.segments().count(), 0);
    }

    #[test]
    fn test_missing_path_is_empty() {
        let uri = EndpointUri::parse("coaps://10.0.0.5:6000").unwrap();
        assert_eq!(uri.scheme(), "coaps");
        assert_eq!(uri.port(), 6000);
        assert_eq!(uri.path(), "");
    }

    #[test]
    fn test_empty_segments_skipped() {
        let uri = EndpointUri::parse("coap://h//a///b/").unwrap();
        assert_eq!(uri.segments().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_ipv6_literal() {
        let uri = EndpointUri::parse("coap://[::1]:5684/x").unwrap();
        assert_eq!(uri.host(), "::1");
        assert_eq!(uri.port(), 5684);

        let uri = EndpointUri::parse("coap://[fe80::1]/x").unwrap();
        assert_eq!(uri.port(), DEFAULT_PORT);
        assert_eq!(uri.to_string(), "coap://[fe80::1]:5683/x");
    }

    #[test]
    fn test_malformed() {
        for bad in [
            "192.168.1.52/sensor",
            "coap:/192.168.1.52/sensor",
            "://192.168.1.52/sensor",
            "co ap://h/x",
            "coap:///sensor",
            "coap://:5683/sensor",
            "coap://h:/x",
            "coap://h:abc/x",
            "coap://h:70000/x",
            "coap://h:0/x",
            "coap://[::1/x",
            "coap://[::1]x/x",
            "coap://::1/x",
            "coap://user@h/x",
        ] {
            assert!(
                matches!(EndpointUri::parse(bad), Err(ParseError::MalformedUri(_))),
                "expected MalformedUri for {bad}"
            );
        }
    }

    #[test]
    fn test_too_long_fields() {
        let host = "h".repeat(MAX_FIELD_LEN + 1);
        assert_eq!(
            EndpointUri::parse(&format!("coap://{host}/x")),
            Err(ParseError::TooLong {
                field: UriField::Host,
                len: 64,
                max: MAX_FIELD_LEN
            })
        );

        let path = "p".repeat(MAX_FIELD_LEN + 1);
        assert!(matches!(
            EndpointUri::parse(&format!("coap://h/{path}")),
            Err(ParseError::TooLong {
                field: UriField::Path,
                ..
            })
        ));

        let query = "q".repeat(MAX_FIELD_LEN + 1);
        assert!(matches!(
            EndpointUri::parse(&format!("coap://h/x?{query}")),
            Err(ParseError::TooLong {
                field: UriField::Query,
                ..
            })
        ));
    }

    #[test]
    fn test_fields_at_limit_accepted() {
        let host = "h".repeat(MAX_FIELD_LEN);
        let path = "p".repeat(MAX_FIELD_LEN);
        let query = "q".repeat(MAX_FIELD_LEN);
        let uri = EndpointUri::parse(&format!("coap://{host}:1/{path}?{query}")).unwrap();
        assert_eq!(uri.host().len(), MAX_FIELD_LEN);
        assert_eq!(uri.path().len(), MAX_FIELD_LEN);
        assert_eq!(uri.query().len(), MAX_FIELD_LEN);
    }

    #[test]
    fn test_display_roundtrip() {
        let text = "coap://192.168.1.52:5683/sensor/send-data?node=1";
        let uri = EndpointUri::parse(text).unwrap();
        assert_eq!(uri.to_string(), text);
        assert_eq!(EndpointUri::parse(&uri.to_string()).unwrap(), uri);
    }
}
