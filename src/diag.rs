//! Diagnostics - Explicit logging context
//!
//! Every pipeline stage receives a `&LogContext` instead of reaching for
//! process-wide flags. The context is built once at startup and only read
//! afterwards.

use std::fmt;
use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

/// Pipeline stage named in every diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Disassemble,
    Decompile,
    Package,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Disassemble => "disassemble",
            Stage::Decompile => "decompile",
            Stage::Package => "package",
        };
        f.write_str(name)
    }
}

/// Logging sink handle plus the debug-verbosity flag
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Emit byte-level detail (lengths, magic hex) when set
    debug: bool,
    /// `log` target used for all lines
    target: &'static str,
}

impl LogContext {
    pub const DEFAULT_TARGET: &'static str = "dxbc_decomp";

    /// Create a context without installing a global logger
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            target: Self::DEFAULT_TARGET,
        }
    }

    /// Create a context and install `env_logger` on first use.
    ///
    /// Later calls never reinstall or reset the logger.
    pub fn init(debug: bool) -> Self {
        LOGGER_INIT.call_once(|| {
            let default_filter = if debug { "debug" } else { "warn" };
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(default_filter),
            )
            .try_init();
        });
        Self::new(debug)
    }

    /// Read the debug flag from `DXBC_DECOMP_DEBUG` (unset, empty or `0` means off)
    pub fn from_env() -> Self {
        let debug = std::env::var("DXBC_DECOMP_DEBUG")
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);
        Self::init(debug)
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn info(&self, stage: Stage, args: fmt::Arguments<'_>) {
        log::info!(target: self.target, "[{}] {}", stage, args);
    }

    pub fn error(&self, stage: Stage, args: fmt::Arguments<'_>) {
        log::error!(target: self.target, "[{}] {}", stage, args);
    }

    /// Only emitted when the context's debug flag is set
    pub fn debug(&self, stage: Stage, args: fmt::Arguments<'_>) {
        if self.debug {
            log::debug!(target: self.target, "[{}] {}", stage, args);
        }
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new(false)
    }
}
