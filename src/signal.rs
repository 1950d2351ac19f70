//! Ctrl+C handling.
//!
//! The first Ctrl+C raises a shared [`Interrupt`] flag. Directory expansion
//! stops yielding entries, and the finder returns
//! [`crate::duplicates::FinderError::Interrupted`] before its next insertion,
//! so the process still exits through the normal error path with
//! [`ExitCode::Interrupted`]. A second Ctrl+C exits immediately with the same
//! code, for sources that block inside a read.
//!
//! ```rust,no_run
//! use treedupe::duplicates::FinderConfig;
//!
//! let interrupt = treedupe::signal::arm();
//! let config = FinderConfig::default().with_shutdown_flag(interrupt.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::ExitCode;

/// Cancellation token shared between the Ctrl+C hook and the workers.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Raise the flag as if Ctrl+C had been pressed.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// The underlying flag, for [`crate::duplicates::FinderConfig`] and the
    /// directory walker.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.raised)
    }

    fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }
}

static ARMED: OnceLock<Interrupt> = OnceLock::new();

/// Hook Ctrl+C and return a cleared [`Interrupt`].
///
/// The hook is installed once per process; later calls (several `run_app`
/// invocations in one test binary, for instance) get the same token back
/// with its flag cleared. When the hook cannot be installed because another
/// handler owns the signal, the token still works through
/// [`Interrupt::raise`].
pub fn arm() -> Interrupt {
    let interrupt = ARMED.get_or_init(|| {
        let interrupt = Interrupt::new();
        let hook = interrupt.clone();

        if let Err(e) = ctrlc::set_handler(move || on_ctrl_c(&hook)) {
            log::debug!("Ctrl+C hook not installed: {}", e);
        }
        interrupt
    });

    interrupt.clear();
    interrupt.clone()
}

fn on_ctrl_c(interrupt: &Interrupt) {
    let mut stderr = std::io::stderr();

    if interrupt.is_raised() {
        let _ = writeln!(stderr, "\nInterrupted again, exiting");
        std::process::exit(ExitCode::Interrupted.as_i32());
    }

    interrupt.raise();
    let _ = writeln!(stderr, "\nInterrupted, stopping classification (Ctrl+C again to exit now)");
    let _ = stderr.flush();
    log::info!("Interrupt received");
}
