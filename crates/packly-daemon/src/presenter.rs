// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::collaborators::{DeliveryError, Presenter};
use crate::delivery::{
    CompactSummary, DetailedSummary, ReportAttachment, RevealBatch, SingleReveal,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
enum PresentationEvent<'a> {
    Ready {
        user: &'a str,
        count: u64,
    },
    Reveal {
        user: &'a str,
        reveal: &'a SingleReveal,
    },
    RevealBatch {
        user: &'a str,
        batch: &'a RevealBatch,
    },
    DetailedSummary {
        user: &'a str,
        summary: &'a DetailedSummary,
    },
    CompactSummary {
        user: &'a str,
        summary: &'a CompactSummary,
    },
    Direct {
        user: &'a str,
        summary: &'a CompactSummary,
        attachment: &'a ReportAttachment,
    },
    Private {
        user: &'a str,
        content: &'a str,
    },
    PublicAttachment {
        user: &'a str,
        caption: &'a str,
        attachment: &'a ReportAttachment,
    },
    Failure {
        user: &'a str,
        message: &'a str,
    },
}

/// Writes every presentation event as one JSON object per line.
pub struct JsonLinesPresenter<W> {
    out: Mutex<W>,
    direct_messages: bool,
}

impl<W: Write + Send> JsonLinesPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            direct_messages: true,
        }
    }

    /// Users without reachable direct messages exercise the fallback chain.
    pub fn without_direct_messages(mut self) -> Self {
        self.direct_messages = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, event: &PresentationEvent<'_>) -> Result<(), DeliveryError> {
        let line =
            serde_json::to_string(event).map_err(|err| DeliveryError::Rejected(err.to_string()))?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|err| DeliveryError::Channel(err.to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> Presenter for JsonLinesPresenter<W> {
    async fn announce_ready(&self, user: &str, count: u64) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::Ready { user, count })
    }

    async fn reveal_single(&self, user: &str, reveal: &SingleReveal) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::Reveal { user, reveal })
    }

    async fn reveal_batch(&self, user: &str, batch: &RevealBatch) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::RevealBatch { user, batch })
    }

    async fn detailed_summary(
        &self,
        user: &str,
        summary: &DetailedSummary,
    ) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::DetailedSummary { user, summary })
    }

    async fn compact_summary(
        &self,
        user: &str,
        summary: &CompactSummary,
    ) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::CompactSummary { user, summary })
    }

    async fn send_direct(
        &self,
        user: &str,
        summary: &CompactSummary,
        report: &ReportAttachment,
    ) -> Result<(), DeliveryError> {
        if !self.direct_messages {
            return Err(DeliveryError::Unreachable);
        }
        self.emit(&PresentationEvent::Direct {
            user,
            summary,
            attachment: report,
        })
    }

    async fn send_private(&self, user: &str, content: &str) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::Private { user, content })
    }

    async fn send_public_attachment(
        &self,
        user: &str,
        caption: &str,
        report: &ReportAttachment,
    ) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::PublicAttachment {
            user,
            caption,
            attachment: report,
        })
    }

    async fn notify_failure(&self, user: &str, message: &str) -> Result<(), DeliveryError> {
        self.emit(&PresentationEvent::Failure { user, message })
    }
}
