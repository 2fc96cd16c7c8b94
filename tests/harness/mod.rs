// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for flood and injection simulation.
//!
//! Drives the limiter and validator with generated traffic to check that
//! quotas hold and hostile input never reaches a webhook intact.

pub mod floods;
pub mod generators;
pub mod metrics;
