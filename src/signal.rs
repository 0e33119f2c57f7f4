//! Cooperative cancellation on Ctrl+C.
//!
//! A single `AtomicBool` is shared by the walker, the hashing workers and
//! the runner. Raising it stops the scanner from producing new records and
//! makes workers finish their current file, after which the runner saves
//! both caches and exits with [`EXIT_CODE_INTERRUPTED`].
//!
//! ```rust,no_run
//! use hashsync::signal::install_handler;
//!
//! let handler = install_handler();
//! let flag = handler.get_flag();
//! // hand `flag` to Walker / Hasher / HashPoolConfig
//! # let _ = flag;
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (128 + 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed since the handler was installed.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag.
    #[cfg(test)]
    pub(crate) fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// A clone of the flag for worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// The hook can only be registered once per process. Later calls (for
/// example several `run_app` invocations from tests) get the same handler
/// back with its flag lowered. If registration fails the returned handler
/// still works for programmatic shutdown requests.
pub fn install_handler() -> ShutdownHandler {
    let handler = GLOBAL_HANDLER
        .get_or_init(|| {
            let handler = ShutdownHandler::new();
            let flag = handler.get_flag();
            let installed = ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
                let mut stderr = std::io::stderr();
                let _ = writeln!(stderr, "\nInterrupted. Saving caches...");
                let _ = stderr.flush();
                log::info!("Shutdown signal received");
            });
            if let Err(e) = installed {
                log::debug!("Ctrl+C handler not installed: {e}");
            }
            handler
        })
        .clone();
    handler.reset();
    handler
}
