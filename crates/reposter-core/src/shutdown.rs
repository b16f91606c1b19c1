//! Process shutdown signal shared by every long-running stage.
//!
//! The binary owns the `watch::Sender`; stages hold receivers and race their
//! network calls and sleeps against [`shutdown_requested`].

use std::future::Future;

use tokio::sync::watch;

pub type ShutdownRx = watch::Receiver<bool>;

/// A sender/receiver pair starting in the "running" state.
#[must_use]
pub fn channel() -> (watch::Sender<bool>, ShutdownRx) {
    watch::channel(false)
}

#[must_use]
pub fn is_shutdown(rx: &ShutdownRx) -> bool {
    *rx.borrow()
}

/// Resolves once shutdown has been requested. Never resolves if the sender
/// is dropped without requesting shutdown.
pub async fn shutdown_requested(rx: &mut ShutdownRx) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run `fut` unless shutdown is requested first; `None` means cancelled.
pub async fn cancellable<F: Future>(fut: F, rx: &mut ShutdownRx) -> Option<F::Output> {
    if is_shutdown(rx) {
        return None;
    }
    tokio::select! {
        out = fut => Some(out),
        () = shutdown_requested(rx) => None,
    }
}
