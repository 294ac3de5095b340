// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent<'a> {
    pub job_id: u64,
    pub user: &'a str,
    pub count: u64,
    pub from: &'a str,
    pub to: &'a str,
}

#[derive(Debug, Default)]
struct TelemetryState {
    commands_total: BTreeMap<(String, String), u64>,
    rejects_total: BTreeMap<String, u64>,
    packs_opened_total: BTreeMap<String, u64>,
    jobs_total: BTreeMap<String, u64>,
    report_delivery_total: BTreeMap<String, u64>,
    gambles_total: BTreeMap<String, u64>,
    packs_credited_total: u64,
    packs_debited_total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

fn bump<K: Ord>(map: &mut BTreeMap<K, u64>, key: K, by: u64) {
    let entry = map.entry(key).or_insert(0);
    *entry = entry.saturating_add(by);
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle_event(&self, event: &LifecycleEvent<'_>) {
        tracing::info!(target: "packly.lifecycle", event = ?event, "batch job transition");
    }

    pub fn record_command(&self, command: &str, outcome: &str) {
        let mut guard = self.state.lock();
        bump(
            &mut guard.commands_total,
            (command.to_string(), outcome.to_string()),
            1,
        );
    }

    pub fn record_reject(&self, code: &str) {
        bump(&mut self.state.lock().rejects_total, code.to_string(), 1);
    }

    pub fn record_packs_opened(&self, channel: &str, count: u64) {
        bump(
            &mut self.state.lock().packs_opened_total,
            channel.to_string(),
            count,
        );
    }

    pub fn record_job(&self, result: &str) {
        bump(&mut self.state.lock().jobs_total, result.to_string(), 1);
    }

    pub fn record_report_delivery(&self, tier: &str) {
        bump(
            &mut self.state.lock().report_delivery_total,
            tier.to_string(),
            1,
        );
    }

    pub fn record_gamble(&self, outcome: &str) {
        bump(&mut self.state.lock().gambles_total, outcome.to_string(), 1);
    }

    pub fn record_admin_credit(&self, amount: u64) {
        let mut guard = self.state.lock();
        guard.packs_credited_total = guard.packs_credited_total.saturating_add(amount);
    }

    pub fn record_admin_debit(&self, amount: u64) {
        let mut guard = self.state.lock();
        guard.packs_debited_total = guard.packs_debited_total.saturating_add(amount);
    }

    pub fn jobs_total(&self, result: &str) -> u64 {
        self.state
            .lock()
            .jobs_total
            .get(result)
            .copied()
            .unwrap_or(0)
    }

    pub fn render(&self) -> String {
        let guard = self.state.lock();
        let mut out = String::new();
        out.push_str("# TYPE packly_commands_total counter\n");
        for ((command, outcome), value) in &guard.commands_total {
            let _ = writeln!(
                out,
                "packly_commands_total{{command=\"{}\",outcome=\"{}\"}} {}",
                command, outcome, value
            );
        }
        out.push_str("# TYPE packly_rejects_total counter\n");
        for (code, value) in &guard.rejects_total {
            let _ = writeln!(out, "packly_rejects_total{{code=\"{}\"}} {}", code, value);
        }
        out.push_str("# TYPE packly_packs_opened_total counter\n");
        for (channel, value) in &guard.packs_opened_total {
            let _ = writeln!(
                out,
                "packly_packs_opened_total{{channel=\"{}\"}} {}",
                channel, value
            );
        }
        out.push_str("# TYPE packly_jobs_total counter\n");
        for (result, value) in &guard.jobs_total {
            let _ = writeln!(out, "packly_jobs_total{{result=\"{}\"}} {}", result, value);
        }
        out.push_str("# TYPE packly_report_delivery_total counter\n");
        for (tier, value) in &guard.report_delivery_total {
            let _ = writeln!(
                out,
                "packly_report_delivery_total{{tier=\"{}\"}} {}",
                tier, value
            );
        }
        out.push_str("# TYPE packly_gambles_total counter\n");
        for (outcome, value) in &guard.gambles_total {
            let _ = writeln!(
                out,
                "packly_gambles_total{{outcome=\"{}\"}} {}",
                outcome, value
            );
        }
        out.push_str("# TYPE packly_admin_credited_total counter\n");
        let _ = writeln!(
            out,
            "packly_admin_credited_total {}",
            guard.packs_credited_total
        );
        out.push_str("# TYPE packly_admin_debited_total counter\n");
        let _ = writeln!(out, "packly_admin_debited_total {}", guard.packs_debited_total);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_labelled_counters() {
        let telemetry = Telemetry::new();
        telemetry.record_command("batch_open", "success");
        telemetry.record_command("batch_open", "success");
        telemetry.record_reject("RESOURCE_EXHAUSTED");
        telemetry.record_packs_opened("standard", 40);
        telemetry.record_report_delivery("private_chunks");
        telemetry.record_admin_credit(7);

        let text = telemetry.render();
        assert!(text
            .contains("packly_commands_total{command=\"batch_open\",outcome=\"success\"} 2"));
        assert!(text.contains("packly_rejects_total{code=\"RESOURCE_EXHAUSTED\"} 1"));
        assert!(text.contains("packly_packs_opened_total{channel=\"standard\"} 40"));
        assert!(text.contains("packly_report_delivery_total{tier=\"private_chunks\"} 1"));
        assert!(text.contains("packly_admin_credited_total 7"));
    }

    #[test]
    fn counters_saturate() {
        let telemetry = Telemetry::new();
        telemetry.record_packs_opened("weekly", u64::MAX);
        telemetry.record_packs_opened("weekly", 5);
        assert!(telemetry
            .render()
            .contains(&format!("packly_packs_opened_total{{channel=\"weekly\"}} {}", u64::MAX)));
    }
}
