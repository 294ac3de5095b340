// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use packly_core::PacklyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorCode {
    InvalidInput,
    Forbidden,
    FailedPrecondition,
    ResourceExhausted,
    Unavailable,
    Internal,
}

impl PublicErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Forbidden => "FORBIDDEN",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl From<&PacklyError> for PublicErrorCode {
    fn from(err: &PacklyError) -> Self {
        match err {
            PacklyError::InvalidCount { .. } | PacklyError::InvalidAmount { .. } => {
                Self::InvalidInput
            }
            PacklyError::AccountTooNew { .. } | PacklyError::InsufficientBalance { .. } => {
                Self::FailedPrecondition
            }
            PacklyError::AlreadyActive
            | PacklyError::ClaimLimitReached { .. }
            | PacklyError::CooldownActive { .. } => Self::ResourceExhausted,
            PacklyError::Unauthorized => Self::Forbidden,
            PacklyError::CatalogEmpty => Self::Unavailable,
        }
    }
}

fn format_wait(ms: u64) -> String {
    let total_minutes = ms.div_ceil(60_000);
    let (days, rem) = (total_minutes / (24 * 60), total_minutes % (24 * 60));
    let (hours, minutes) = (rem / 60, rem % 60);
    match (days, hours) {
        (0, 0) => format!("{minutes}m"),
        (0, _) => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h {minutes}m"),
    }
}

/// User-facing text for a rejection.
pub fn public_message(err: &PacklyError) -> String {
    match err {
        PacklyError::InvalidCount { min, max, .. } => {
            format!("You can open between {min} and {max} packs at a time.")
        }
        PacklyError::InvalidAmount { min, max, .. } => {
            format!("You can gamble between {min} and {max} packs.")
        }
        PacklyError::AccountTooNew { min_age_days } => {
            format!("Your account must be at least {min_age_days} days old to use this command.")
        }
        PacklyError::InsufficientBalance {
            requested,
            available,
        } => format!("You need {requested} packs but only have {available}."),
        PacklyError::AlreadyActive => {
            "You already have a pack opening in progress. Please wait for it to finish.".into()
        }
        PacklyError::ClaimLimitReached { retry_after_ms } => format!(
            "You have used all your daily claims. Try again in {}.",
            format_wait(*retry_after_ms)
        ),
        PacklyError::CooldownActive { retry_after_ms } => format!(
            "You already claimed your weekly pack. Try again in {}.",
            format_wait(*retry_after_ms)
        ),
        PacklyError::Unauthorized => "You are not allowed to use this command.".into(),
        PacklyError::CatalogEmpty => "No rewards are available right now.".into(),
    }
}
