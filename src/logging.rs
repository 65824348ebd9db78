use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber.
///
/// All diagnostics go to stderr so the snapshot sink and stdout stay clean.
/// `RUST_LOG` controls filtering (default "info"), e.g.
/// `RUST_LOG=esgf_snapshot=debug` to see per-page progress.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}
