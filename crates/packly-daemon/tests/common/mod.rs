#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use packly_core::catalog::{Item, ItemFilter, SpecialDefinition, SpecialFilter};
use packly_daemon::collaborators::{Catalog, CatalogError, DeliveryError, Presenter};
use packly_daemon::delivery::{
    CompactSummary, DetailedSummary, ReportAttachment, RevealBatch, SingleReveal,
};
use packly_daemon::memory::InMemoryCatalog;
use parking_lot::Mutex;

pub fn item(id: u64, rarity: f64) -> Item {
    Item {
        id,
        display_name: format!("Player {id}"),
        rarity,
        attack: 50 + id as i32,
        health: 80,
        card_regime: Some("Base".to_string()),
        enabled: true,
    }
}

pub fn special(id: u64, name: &str, threshold: f64) -> SpecialDefinition {
    SpecialDefinition {
        id,
        name: name.to_string(),
        rarity_threshold: threshold,
        visible: true,
        start_ms: None,
        end_ms: None,
        emoji: None,
    }
}

/// Items spread over every standard and weekly tier.
pub fn sample_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(
        vec![
            item(1, 10.0),
            item(2, 3.0),
            item(3, 2.0),
            item(4, 1.0),
            item(5, 0.2),
            item(6, 0.05),
        ],
        vec![special(100, "Shiny", 0.5)],
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Ready { user: String, count: u64 },
    Single(SingleReveal),
    Batch(RevealBatch),
    Detailed(DetailedSummary),
    Compact(CompactSummary),
    Direct { filename: String },
    Private(String),
    Public { caption: String },
    Failure(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailureMode {
    pub direct: bool,
    pub private: bool,
    pub public: bool,
    pub failure_notice: bool,
}

/// Records every call; selected transports can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Mutex<Vec<Recorded>>,
    pub fail: FailureMode,
}

impl RecordingPresenter {
    pub fn failing(fail: FailureMode) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail,
        }
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    fn push(&self, event: Recorded) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn announce_ready(&self, user: &str, count: u64) -> Result<(), DeliveryError> {
        self.push(Recorded::Ready {
            user: user.to_string(),
            count,
        });
        Ok(())
    }

    async fn reveal_single(&self, _user: &str, reveal: &SingleReveal) -> Result<(), DeliveryError> {
        self.push(Recorded::Single(reveal.clone()));
        Ok(())
    }

    async fn reveal_batch(&self, _user: &str, batch: &RevealBatch) -> Result<(), DeliveryError> {
        self.push(Recorded::Batch(batch.clone()));
        Ok(())
    }

    async fn detailed_summary(
        &self,
        _user: &str,
        summary: &DetailedSummary,
    ) -> Result<(), DeliveryError> {
        self.push(Recorded::Detailed(summary.clone()));
        Ok(())
    }

    async fn compact_summary(
        &self,
        _user: &str,
        summary: &CompactSummary,
    ) -> Result<(), DeliveryError> {
        self.push(Recorded::Compact(summary.clone()));
        Ok(())
    }

    async fn send_direct(
        &self,
        _user: &str,
        _summary: &CompactSummary,
        report: &ReportAttachment,
    ) -> Result<(), DeliveryError> {
        if self.fail.direct {
            return Err(DeliveryError::Unreachable);
        }
        self.push(Recorded::Direct {
            filename: report.filename.clone(),
        });
        Ok(())
    }

    async fn send_private(&self, _user: &str, content: &str) -> Result<(), DeliveryError> {
        if self.fail.private {
            return Err(DeliveryError::Rejected("interaction expired".into()));
        }
        self.push(Recorded::Private(content.to_string()));
        Ok(())
    }

    async fn send_public_attachment(
        &self,
        _user: &str,
        caption: &str,
        _report: &ReportAttachment,
    ) -> Result<(), DeliveryError> {
        if self.fail.public {
            return Err(DeliveryError::Channel("missing permissions".into()));
        }
        self.push(Recorded::Public {
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn notify_failure(&self, _user: &str, message: &str) -> Result<(), DeliveryError> {
        if self.fail.failure_notice {
            return Err(DeliveryError::Unreachable);
        }
        self.push(Recorded::Failure(message.to_string()));
        Ok(())
    }
}

/// Serves the wrapped catalog for the first `healthy_queries` item queries,
/// then reports an empty catalog.
pub struct DrainingCatalog {
    pub inner: InMemoryCatalog,
    pub healthy_queries: usize,
    pub queries: AtomicUsize,
}

impl DrainingCatalog {
    pub fn new(inner: InMemoryCatalog, healthy_queries: usize) -> Self {
        Self {
            inner,
            healthy_queries,
            queries: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Catalog for DrainingCatalog {
    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, CatalogError> {
        let seen = self.queries.fetch_add(1, Ordering::SeqCst);
        if seen >= self.healthy_queries {
            return Ok(Vec::new());
        }
        self.inner.query_items(filter).await
    }

    async fn query_specials(
        &self,
        filter: &SpecialFilter,
    ) -> Result<Vec<SpecialDefinition>, CatalogError> {
        self.inner.query_specials(filter).await
    }
}

/// Catalog backend that is never reachable.
pub struct OfflineCatalog;

#[async_trait]
impl Catalog for OfflineCatalog {
    async fn query_items(&self, _filter: &ItemFilter) -> Result<Vec<Item>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }

    async fn query_specials(
        &self,
        _filter: &SpecialFilter,
    ) -> Result<Vec<SpecialDefinition>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }
}
