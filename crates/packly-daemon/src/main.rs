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

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use packly_core::clock::SystemClock;
use packly_daemon::collaborators::StaticAuthorizer;
use packly_daemon::commands::{CommandRequest, PackService};
use packly_daemon::config::DaemonConfig;
use packly_daemon::fulfillment::Collaborators;
use packly_daemon::memory::{InMemoryCatalog, InMemoryPersistence};
use packly_daemon::presenter::JsonLinesPresenter;

#[derive(Debug, Parser)]
#[command(name = "packly-daemon")]
#[command(about = "Packly pack distribution and economy engine")]
struct Args {
    /// JSON catalog with `items` and `specials`.
    #[arg(long)]
    catalog: PathBuf,

    /// Treat every user as unreachable by direct message.
    #[arg(long)]
    no_direct_messages: bool,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the JSON-lines protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::from_env();
    let catalog = InMemoryCatalog::from_json_file(&args.catalog)?;
    let presenter = JsonLinesPresenter::new(std::io::stdout());
    let presenter = if args.no_direct_messages {
        presenter.without_direct_messages()
    } else {
        presenter
    };
    let collaborators = Collaborators {
        catalog: Arc::new(catalog),
        persistence: Arc::new(InMemoryPersistence::new()),
        presenter: Arc::new(presenter),
    };
    let service = PackService::start(
        config,
        collaborators,
        Arc::new(StaticAuthorizer::from_env()),
        Arc::new(SystemClock),
    );
    tracing::info!(catalog = %args.catalog.display(), "reading commands from stdin");

    let mut completions = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut request_id: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        request_id += 1;
        let request: CommandRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(request_id, error = %err, "unparseable command line");
                println!(
                    "{}",
                    json!({"type": "outcome", "request_id": request_id,
                           "outcome": "error", "message": err.to_string()})
                );
                continue;
            }
        };
        let handled = service.handle(request).await;
        println!(
            "{}",
            json!({"type": "outcome", "request_id": request_id, "result": handled.outcome})
        );
        if let Some(completion) = handled.completion {
            completions.spawn(async move {
                if let Ok(outcome) = completion.await {
                    println!(
                        "{}",
                        json!({"type": "job", "request_id": request_id, "result": outcome})
                    );
                }
            });
        }
    }

    let stats = service.shutdown().await;
    while completions.join_next().await.is_some() {}
    tracing::info!(?stats, "all batch jobs drained; exiting");
    println!("{}", json!({"type": "shutdown", "stats": stats}));
    Ok(())
}
