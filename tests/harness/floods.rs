// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Flood patterns for rate limiter simulation.

/// Flood pattern configuration.
#[derive(Debug, Clone)]
pub struct FloodConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of distinct client identifiers
    pub unique_clients: usize,
    /// Simulated milliseconds between consecutive requests
    pub spacing_ms: i64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_clients: 1,
            spacing_ms: 100,
        }
    }
}

/// Predefined flood patterns.
impl FloodConfig {
    /// One client hammering the contact form.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 200,
            unique_clients: 1,
            spacing_ms: 10,
        }
    }

    /// Many clients, each sending a little.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            unique_clients: 100,
            spacing_ms: 5,
        }
    }

    /// One client sending slowly across several windows.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            unique_clients: 1,
            spacing_ms: 4 * 60 * 1000,
        }
    }
}
