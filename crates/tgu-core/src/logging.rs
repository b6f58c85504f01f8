use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for a binary. Call once, before any work items run.
///
/// Default: info for our crates, overridable with `RUST_LOG`.
pub fn init(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,tgu_core=info,{service_name}=info"))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();
}
