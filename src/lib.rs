//! IllAdvised - dual-camera recording with live sensor telemetry.
//!
//! This is the main library crate. It provides the recording pipeline
//! (capture sources, overlay compositing, container writing) along with the
//! telemetry and settings services the recorder app is built from.

pub mod capture;
pub mod config;
pub mod media;
pub mod recorder;
pub mod settings;
pub mod telemetry;
pub mod utils;
pub mod writer;

pub use config::RecorderConfig;
pub use recorder::{RecordingCoordinator, RecordingError, RecordingEvent, RecordingResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "illadvised=debug,illadvised_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
