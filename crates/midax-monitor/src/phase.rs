//! Session phase watcher.

use midax_core::types::SessionPhase;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Log every phase change until the session stops or the trader goes away.
///
/// The task resolves to the phases observed, in order.
pub fn watch_phases(mut rx: watch::Receiver<SessionPhase>) -> JoinHandle<Vec<SessionPhase>> {
    tokio::spawn(async move {
        let mut seen = vec![*rx.borrow_and_update()];
        while seen.last() != Some(&SessionPhase::Stopped) {
            if rx.changed().await.is_err() {
                break;
            }
            let phase = *rx.borrow_and_update();
            if seen.last() != Some(&phase) {
                info!(%phase, "Session phase changed");
                seen.push(phase);
            }
        }
        seen
    })
}
