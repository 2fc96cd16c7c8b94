// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identification from proxy headers.
//!
//! The identifier is only a rate-limit bucket key. It is taken from headers
//! set by the fronting proxy and is trivially spoofable when the gateway is
//! reachable directly.

use axum::http::HeaderMap;

/// Identifier used when no proxy header is present.
pub const UNKNOWN_CLIENT: &str = "unknown-client";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Derive the client identifier from request headers.
///
/// Precedence: first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// [`UNKNOWN_CLIENT`].
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header(FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header(REAL_IP)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let map = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_identifier(&map), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let map = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_identifier(&map), "198.51.100.2");

        // An empty forwarded-for entry does not shadow X-Real-IP
        let map = headers(&[("x-forwarded-for", " ,10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_identifier(&map), "198.51.100.2");
    }

    #[test]
    fn test_sentinel_without_headers() {
        assert_eq!(client_identifier(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
