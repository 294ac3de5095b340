// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! packly-core
//!
//! Synchronous building blocks of the Packly reward economy:
//! - Economy ledger (non-negative pack balances, strict and floor debits, gambles)
//! - Claim windows (rolling N-uses-per-window) and fixed cooldowns
//! - Tier-weighted reward sampling and special selection
//! - Catalog value types shared with the daemon's collaborators

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod catalog;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod sampler;
pub mod usage;

pub use crate::error::{PacklyError, PacklyResult};

pub use crate::sampler::Channel;
