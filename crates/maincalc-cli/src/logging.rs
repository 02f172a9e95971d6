use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log to stderr so piped JSON on stdout stays clean.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` turns on debug output for
/// both crates and the default is warnings only.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let default_filter = format!("mcalc={level},maincalc_core={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(atty::is(atty::Stream::Stderr))
                .with_target(verbose),
        )
        .try_init();
}
