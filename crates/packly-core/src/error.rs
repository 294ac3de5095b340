// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type PacklyResult<T> = Result<T, PacklyError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacklyError {
    #[error("pack count {requested} outside allowed range {min}..={max}")]
    InvalidCount { requested: u64, min: u64, max: u64 },

    #[error("amount {requested} outside allowed range {min}..={max}")]
    InvalidAmount { requested: u64, min: u64, max: u64 },

    #[error("account is younger than the required {min_age_days} days")]
    AccountTooNew { min_age_days: u64 },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("a batch opening is already in progress")]
    AlreadyActive,

    #[error("claim limit reached; retry in {retry_after_ms} ms")]
    ClaimLimitReached { retry_after_ms: u64 },

    #[error("cooldown active; retry in {retry_after_ms} ms")]
    CooldownActive { retry_after_ms: u64 },

    #[error("caller is not allowed to perform this operation")]
    Unauthorized,

    #[error("no eligible rewards in the catalog")]
    CatalogEmpty,
}

impl PacklyError {
    /// Rejections that happen before any state is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCount { .. }
                | Self::InvalidAmount { .. }
                | Self::AccountTooNew { .. }
                | Self::InsufficientBalance { .. }
        )
    }
}
