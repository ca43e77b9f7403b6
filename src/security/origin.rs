//! Origin authorization for client indications.
//!
//! # Responsibilities
//! - Parse the indicated origin and resolve the path against it
//! - Check the resolved host against the configured allow-list
//!
//! # Design Decisions
//! - Host matching is case-insensitive; a written port must be listed too
//! - The allow-list is built once at startup and shared read-only
//! - Rejections carry no detail back to the peer; the session is dropped

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::protocol::ClientIndication;

/// Handshake rejected by policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("bad origin")]
    BadOrigin,
    #[error("bad path")]
    BadPath,
}

impl AuthorizationError {
    /// Short label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationError::BadOrigin => "bad_origin",
            AuthorizationError::BadPath => "bad_path",
        }
    }
}

/// Immutable set of hosts the server will service.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    hosts: HashSet<String>,
}

impl AllowedOrigins {
    /// Build the table. Entries are normalized to lowercase.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: origins
                .into_iter()
                .map(|o| o.as_ref().trim().to_lowercase())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive membership check.
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Validate a decoded client indication against the allow-list.
///
/// `path` is resolved relative to `origin`, so an absolute or scheme-relative
/// path can move the target to another host; the authority of the resolved
/// target is what gets authorized. The lookup key is the host, followed by
/// `:port` whenever the authority was written with a port (scheme-default
/// ports included), so `example.com` and `example.com:443` are distinct entries.
pub fn validate(indication: &ClientIndication, allowed: &AllowedOrigins) -> Result<(), AuthorizationError> {
    let origin = Url::parse(&indication.origin).map_err(|_| AuthorizationError::BadOrigin)?;
    if origin.host_str().is_none() {
        return Err(AuthorizationError::BadOrigin);
    }

    if indication.path.is_empty() {
        return Err(AuthorizationError::BadPath);
    }

    let target = origin
        .join(&indication.path)
        .map_err(|_| AuthorizationError::BadPath)?;

    let host = target.host_str().ok_or(AuthorizationError::BadOrigin)?;
    let authority = if replaces_authority(&indication.path) {
        &indication.path
    } else {
        &indication.origin
    };
    let key = match target.port_or_known_default() {
        Some(port) if has_explicit_port(authority) => format!("{}:{}", host, port),
        _ => host.to_string(),
    };

    if allowed.contains(&key) {
        Ok(())
    } else {
        Err(AuthorizationError::BadOrigin)
    }
}

/// True when resolving `path` takes its authority from `path` itself:
/// an absolute URL or a scheme-relative reference.
fn replaces_authority(path: &str) -> bool {
    path.starts_with("//") || Url::parse(path).is_ok()
}

/// True when the authority of `url` (absolute or scheme-relative) was written
/// with a port.
fn has_explicit_port(url: &str) -> bool {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => match url.strip_prefix("//") {
            Some(rest) => rest,
            None => return false,
        },
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    let port = match host_port.rfind(']') {
        Some(close) => host_port[close + 1..].strip_prefix(':'),
        None => host_port.rsplit_once(':').map(|(_, port)| port),
    };
    port.is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn allow(origins: &[&str]) -> AllowedOrigins {
        AllowedOrigins::new(origins.iter().copied())
    }

    #[test]
    fn allowed_origin_passes() {
        let indication = ClientIndication::new("https://example.com", "/app");
        assert_eq!(validate(&indication, &allow(&["example.com"])), Ok(()));
    }

    #[test]
    fn unknown_origin_is_rejected() {
        let indication = ClientIndication::new("https://evil.com", "/app");
        assert_eq!(
            validate(&indication, &allow(&["example.com"])),
            Err(AuthorizationError::BadOrigin)
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        let indication = ClientIndication::new("https://example.com", "");
        assert_eq!(
            validate(&indication, &allow(&["example.com"])),
            Err(AuthorizationError::BadPath)
        );
    }

    #[test]
    fn unparsable_origin_is_rejected() {
        let allowed = allow(&["example.com"]);
        for origin in ["", "example.com", "https://", "::not a url::"] {
            let indication = ClientIndication::new(origin, "/app");
            assert_eq!(
                validate(&indication, &allowed),
                Err(AuthorizationError::BadOrigin),
                "origin {:?}",
                origin
            );
        }
    }

    #[test]
    fn origin_without_host_is_rejected() {
        let indication = ClientIndication::new("mailto:someone@example.com", "/app");
        assert_eq!(
            validate(&indication, &allow(&["example.com"])),
            Err(AuthorizationError::BadOrigin)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let indication = ClientIndication::new("https://example.com", "/app");
        assert_eq!(validate(&indication, &allow(&["Example.COM"])), Ok(()));

        let indication = ClientIndication::new("https://EXAMPLE.com", "/app");
        assert_eq!(validate(&indication, &allow(&["example.com"])), Ok(()));
    }

    #[test]
    fn relative_path_keeps_origin_host() {
        let indication = ClientIndication::new("https://example.com/base/", "counter");
        assert_eq!(validate(&indication, &allow(&["example.com"])), Ok(()));
    }

    #[test]
    fn scheme_relative_path_changes_host() {
        let indication = ClientIndication::new("https://example.com", "//evil.com/app");
        assert_eq!(
            validate(&indication, &allow(&["example.com"])),
            Err(AuthorizationError::BadOrigin)
        );
    }

    #[test]
    fn absolute_path_url_replaces_origin() {
        let indication = ClientIndication::new("https://evil.com", "https://example.com/app");
        assert_eq!(validate(&indication, &allow(&["example.com"])), Ok(()));
    }

    #[test]
    fn explicit_port_must_be_listed() {
        let indication = ClientIndication::new("https://localhost:8080", "/echo");
        assert_eq!(
            validate(&indication, &allow(&["localhost"])),
            Err(AuthorizationError::BadOrigin)
        );
        assert_eq!(validate(&indication, &allow(&["localhost:8080"])), Ok(()));

        let pinned = allow(&["example.com:8443"]);
        let indication = ClientIndication::new("https://example.com:9443", "/app");
        assert_eq!(validate(&indication, &pinned), Err(AuthorizationError::BadOrigin));
        let indication = ClientIndication::new("https://example.com", "/app");
        assert_eq!(validate(&indication, &pinned), Err(AuthorizationError::BadOrigin));
    }

    #[test]
    fn written_default_port_is_part_of_the_key() {
        let indication = ClientIndication::new("https://example.com:443", "/app");
        assert_eq!(validate(&indication, &allow(&["example.com:443"])), Ok(()));
        assert_eq!(
            validate(&indication, &allow(&["example.com"])),
            Err(AuthorizationError::BadOrigin)
        );
    }

    #[test]
    fn port_comes_from_the_authority_that_wins() {
        let allowed = allow(&["example.com:8443"]);

        let indication = ClientIndication::new("https://example.com:8443", "counter?x=1:2");
        assert_eq!(validate(&indication, &allowed), Ok(()));

        let indication = ClientIndication::new("https://evil.com:9000", "//example.com:8443/app");
        assert_eq!(validate(&indication, &allowed), Ok(()));

        let indication = ClientIndication::new("https://example.com:8443", "https://example.com/app");
        assert_eq!(validate(&indication, &allowed), Err(AuthorizationError::BadOrigin));
    }

    #[test]
    fn port_detection_ignores_userinfo_and_ipv6() {
        assert!(has_explicit_port("https://user:pw@example.com:443/x"));
        assert!(!has_explicit_port("https://user:pw@example.com/x"));
        assert!(has_explicit_port("https://[::1]:4433"));
        assert!(!has_explicit_port("https://[::1]/a:b"));
        assert!(!has_explicit_port("https://example.com:/"));
    }

    #[test]
    fn table_normalizes_entries() {
        let table = allow(&["LocalHost", "  example.com ", ""]);
        assert_eq!(table.len(), 2);
        assert!(table.contains("localhost"));
        assert!(table.contains("EXAMPLE.COM"));
    }

    #[test]
    fn concurrent_validation_sees_the_same_table() {
        let table = Arc::new(allow(&["example.com"]));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    let origin = if i % 2 == 0 { "https://example.com" } else { "https://evil.com" };
                    (i, validate(&ClientIndication::new(origin, "/app"), &table))
                })
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.join().unwrap();
            if i % 2 == 0 {
                assert_eq!(result, Ok(()));
            } else {
                assert_eq!(result, Err(AuthorizationError::BadOrigin));
            }
        }
    }
}
