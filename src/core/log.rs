use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CRATE_TARGET: &str = "ratewatch";

/// Filter used when `RUST_LOG` is unset: only this crate logs, at debug when verbose and
/// warnings otherwise.
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "warn" };
    format!("off,{CRATE_TARGET}={level}")
}

/// Installs the global subscriber on stderr so command output on stdout stays clean.
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .without_time(),
        )
        .with(filter)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
