use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber. `verbose` forces `debug`; otherwise
/// `RUST_LOG` applies with a `warn` floor. A subscriber the host already
/// installed is left in place.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(true);
        init_tracing(false);
        tracing::debug!("still logging");
    }
}
