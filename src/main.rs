//! # brigade
//!
//! Terminal dashboard agent. Keeps the notification channel open and logs
//! routed call/order events and alerts; submits and tracks supplier orders.

#![deny(unsafe_code)]

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use brigade_core::{Payload, UiCategory, WorkflowId};
use brigade_realtime::{
    AlertDispatcher, AudioOutput, ConnectionManager, LogNotifier, WsConnector,
};
use brigade_settings::{load_settings, load_settings_from_path, BrigadeSettings};
use brigade_workflow::{
    Ingredient, Supplier, SupplierOrderRequest, WorkflowError, WorkflowInstance, WorkflowPoller,
    WorkflowStatus,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

/// Restaurant dashboard real-time agent.
#[derive(Parser, Debug)]
#[command(name = "brigade", about = "Restaurant dashboard real-time agent")]
struct Cli {
    /// Settings file (defaults to `BRIGADE_SETTINGS` or `~/.brigade/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and log events until Ctrl-C.
    Listen,

    /// Poll an existing supplier order until it finishes.
    Track {
        order_id: String,

        /// Status checks before giving up (overrides settings).
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Call a supplier with an order, then track the call.
    Order {
        #[arg(long)]
        supplier_id: String,

        #[arg(long)]
        supplier_name: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        email: Option<String>,

        /// `name:quantity:unit`, repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<Ingredient>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("Failed to load settings")?;

    let (telemetry, rejected) = config::telemetry_config(&settings.logging);
    let guard =
        brigade_telemetry::init_telemetry(&telemetry).context("Failed to initialize logging")?;
    for level in rejected {
        warn!(%level, "ignoring invalid log level");
    }
    info!(filter = guard.filter(), "brigade starting");

    match cli.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(&settings).await.map(|()| ExitCode::SUCCESS),
        Command::Track {
            order_id,
            max_attempts,
        } => {
            let poller = poller(&settings)?;
            let id = WorkflowId::from_raw(order_id);
            let budget = max_attempts.unwrap_or(poller.config().max_attempts);
            report(poller.track(&id, print_update, budget).await)
        }
        Command::Order {
            supplier_id,
            supplier_name,
            phone,
            email,
            items,
        } => {
            let poller = poller(&settings)?;
            let order = SupplierOrderRequest {
                supplier: Supplier {
                    id: supplier_id,
                    name: supplier_name,
                    phone,
                    email,
                },
                ingredients: items,
            };
            let id = poller.submit(&order).await.context("Failed to submit order")?;
            println!("order {id} submitted, calling supplier");
            report(poller.track_default(&id, print_update).await)
        }
    }
}

async fn listen(settings: &BrigadeSettings) -> Result<()> {
    let alerts = Arc::new(AlertDispatcher::new(
        config::alert_config(&settings.alerts),
        audio_output(),
        Arc::new(LogNotifier),
    ));
    let permission = alerts.ensure_initialized();
    info!(?permission, "alert outputs ready");

    let manager = ConnectionManager::new(
        config::channel_config(&settings.channel),
        Arc::new(WsConnector),
        alerts,
    );

    let _calls = manager.subscribe(UiCategory::Call, |payload| log_event(UiCategory::Call, payload));
    let _orders =
        manager.subscribe(UiCategory::Order, |payload| log_event(UiCategory::Order, payload));

    let mut state = manager.watch_state();
    let _ = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            info!(state = ?current, "channel state");
        }
    });

    info!(url = %manager.config().url, "connecting");
    manager.connect();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("shutting down");
    manager.disconnect().await;
    let unread = manager.alerts().buffer().unread_count();
    info!(unread, "alerts left unread");
    Ok(())
}

fn log_event(category: UiCategory, payload: &Payload) {
    let payload = serde_json::Value::Object(payload.clone());
    info!(category = %category, %payload, "event");
}

#[cfg(feature = "speaker")]
fn audio_output() -> Arc<dyn AudioOutput> {
    Arc::new(brigade_realtime::Speaker::new())
}

#[cfg(not(feature = "speaker"))]
fn audio_output() -> Arc<dyn AudioOutput> {
    Arc::new(brigade_realtime::SilentAudio)
}

fn poller(settings: &BrigadeSettings) -> Result<WorkflowPoller> {
    let api = config::order_api(&settings.workflow).context("Failed to build API client")?;
    Ok(WorkflowPoller::new(
        Arc::new(api),
        config::poller_config(&settings.workflow),
    ))
}

fn print_update(instance: &WorkflowInstance) {
    println!("order {}: {}", instance.id, instance.status);
}

/// Print the outcome and pick the exit status: 0 finished, 1 call failed,
/// 2 still processing.
fn report(outcome: Result<WorkflowInstance, WorkflowError>) -> Result<ExitCode> {
    outcome_code(outcome).map(ExitCode::from)
}

fn outcome_code(outcome: Result<WorkflowInstance, WorkflowError>) -> Result<u8> {
    let instance = match outcome {
        Ok(instance) => instance,
        Err(e) if e.is_timeout() => {
            println!("{e}; the call is still processing, check again later");
            return Ok(2);
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Order tracking failed")),
    };

    match instance.status {
        WorkflowStatus::Confirmed => {
            if let Some(response) = &instance.supplier_response {
                if let Some(price) = response.total_price {
                    println!("confirmed, total {price:.2}");
                }
                if let Some(delay) = &response.delivery_delay {
                    println!("delivery: {delay}");
                }
            }
            Ok(0)
        }
        WorkflowStatus::Declined => {
            println!(
                "declined: {}",
                instance.decline_reason().unwrap_or("no reason given")
            );
            Ok(0)
        }
        _ => {
            println!("supplier call failed");
            Ok(1)
        }
    }
}
