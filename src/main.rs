// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Galatea server entrypoint.
//!
//! Serves the project CRUD API, the OpenAPI export, and the canvas socket
//! relay at `http://127.0.0.1:<port>/api/...`, persisting project documents
//! under the data directory.

use std::error::Error;
use std::sync::Arc;

const DEFAULT_HTTP_PORT: u16 = 27480;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<data-dir>] [--port <port>] [--durable-writes]\n  {program} [--data-dir <dir>] [--port <port>] [--durable-writes]\n  {program} --print-schema\n\nServes the canvas API at `http://127.0.0.1:<port>/api` (default port {DEFAULT_HTTP_PORT};\n0 = ephemeral). Project documents are stored under the data directory\n(default: the current working directory).\n\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported).\n--print-schema prints the canvas document JSON Schema and exits."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    data_dir: Option<String>,
    port: Option<u16>,
    durable_writes: bool,
    print_schema: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                if options.data_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.data_dir = Some(dir);
            }
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.port = Some(port);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            "--print-schema" => {
                if options.print_schema {
                    return Err(());
                }
                options.print_schema = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.data_dir.is_some() {
                    return Err(());
                }
                options.data_dir = Some(arg);
            }
        }
    }

    if options.print_schema && (options.data_dir.is_some() || options.port.is_some()) {
        return Err(());
    }

    Ok(options)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "galatea".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        if options.print_schema {
            let schema = schemars::schema_for!(galatea::model::CanvasState);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        let data_dir = options.data_dir.unwrap_or_else(|| ".".to_owned());
        let folder = if options.durable_writes {
            galatea::store::ProjectFolder::new(data_dir)
                .with_durability(galatea::store::WriteDurability::Durable)
        } else {
            galatea::store::ProjectFolder::new(data_dir)
        };

        let store: Arc<dyn galatea::store::ProjectStore> = Arc::new(folder);
        let hub = galatea::realtime::BroadcastHub::new();
        let state = galatea::api::AppState::new(store, hub);
        let router = galatea::api::router(state);

        let port = options.port.unwrap_or(DEFAULT_HTTP_PORT);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
            let local_addr = listener.local_addr()?;
            eprintln!("galatea: listening on http://{local_addr}");

            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("galatea: {err}");
        std::process::exit(1);
    }
}
