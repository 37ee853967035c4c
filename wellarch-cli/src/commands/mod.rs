pub mod assess;
pub mod catalog;
pub mod config;
pub mod rescore;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wellarch_core::ProgressUpdate;

/// Logs each progress update.
pub fn log_progress(update: ProgressUpdate) {
    match update.pillar {
        Some(pillar) => info!(percent = update.percent, %pillar, "{}", update.message),
        None => info!(percent = update.percent, phase = %update.phase, "{}", update.message),
    }
}

/// Token cancelled on Ctrl-C; pending pillars then finish with deterministic scores.
pub fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing pending pillars with deterministic scores");
            on_signal.cancel();
        }
    });
    cancel
}
