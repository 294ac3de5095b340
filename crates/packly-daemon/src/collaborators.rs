// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use async_trait::async_trait;
use packly_core::catalog::{
    InstanceId, InstanceSpec, Item, ItemFilter, ItemId, SpecialDefinition, SpecialFilter,
};
use thiserror::Error;

use crate::delivery::{
    CompactSummary, DetailedSummary, ReportAttachment, RevealBatch, SingleReveal,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog file invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
    #[error("bulk create rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("recipient unreachable")]
    Unreachable,
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("delivery channel failed: {0}")]
    Channel(String),
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, CatalogError>;
    async fn query_specials(
        &self,
        filter: &SpecialFilter,
    ) -> Result<Vec<SpecialDefinition>, CatalogError>;
}

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn create_instance(&self, spec: InstanceSpec) -> Result<InstanceId, PersistenceError>;
    /// All-or-nothing: either every spec is stored or none is.
    async fn bulk_create(
        &self,
        specs: Vec<InstanceSpec>,
    ) -> Result<Vec<InstanceId>, PersistenceError>;
    async fn owned_item_ids(&self, owner: &str) -> Result<HashSet<ItemId>, PersistenceError>;
}

/// Rendering and message transport. The engine decides what to send and in
/// which order; implementations decide how it looks.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn announce_ready(&self, user: &str, count: u64) -> Result<(), DeliveryError>;
    async fn reveal_single(&self, user: &str, reveal: &SingleReveal) -> Result<(), DeliveryError>;
    async fn reveal_batch(&self, user: &str, batch: &RevealBatch) -> Result<(), DeliveryError>;
    async fn detailed_summary(
        &self,
        user: &str,
        summary: &DetailedSummary,
    ) -> Result<(), DeliveryError>;
    async fn compact_summary(
        &self,
        user: &str,
        summary: &CompactSummary,
    ) -> Result<(), DeliveryError>;
    /// Private direct message carrying the summary and the full report.
    async fn send_direct(
        &self,
        user: &str,
        summary: &CompactSummary,
        report: &ReportAttachment,
    ) -> Result<(), DeliveryError>;
    /// Private reply visible only to `user`.
    async fn send_private(&self, user: &str, content: &str) -> Result<(), DeliveryError>;
    async fn send_public_attachment(
        &self,
        user: &str,
        caption: &str,
        report: &ReportAttachment,
    ) -> Result<(), DeliveryError>;
    async fn notify_failure(&self, user: &str, message: &str) -> Result<(), DeliveryError>;
}

pub trait Authorizer: Send + Sync {
    fn is_admin(&self, user: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    admins: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma-separated ids from `PACKLY_ADMIN_IDS`.
    pub fn from_env() -> Self {
        let raw = std::env::var("PACKLY_ADMIN_IDS").unwrap_or_default();
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        )
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_admin(&self, user: &str) -> bool {
        self.admins.contains(user)
    }
}
