use std::sync::Once;

// wgpu and naga are chatty at info level.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

static INIT: Once = Once::new();

/// Initializes the global `env_logger` once. `RUST_LOG` overrides the default
/// filter; later calls are no-ops.
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match std::env::var("RUST_LOG") {
            Ok(filter) => builder.parse_filters(&filter),
            Err(_) => builder.parse_filters(DEFAULT_FILTER),
        };
        builder.format_timestamp_millis();
        // Tests and embedders may have installed a logger already.
        if builder.try_init().is_err() {
            log::debug!("logger already installed");
        }
    });
}
