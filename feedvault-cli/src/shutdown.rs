//! Ctrl+C handling.

use feedvault_core::Shutdown;
use tracing::info;

/// Installs the interrupt handler: the first Ctrl+C requests a
/// graceful stop, a second one exits immediately.
pub fn install(shutdown: &Shutdown) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Shutdown requested, finishing current work (Ctrl+C again to force)");
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Forced exit");
            std::process::exit(130);
        }
    });
}
