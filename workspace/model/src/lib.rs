pub mod entities;

/// Installs the process-wide subscriber. The log level is controlled via
/// the RUST_LOG environment variable, falling back to `default_filter`.
#[cfg(not(test))]
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::format::FmtSpan;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();
}
