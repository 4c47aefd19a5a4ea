// Pipeline stages
pub mod processing;
pub mod annotate;
pub mod composite;
pub mod pipeline;

// Data model and configuration
pub mod error;
pub mod field;
pub mod frame;
pub mod config;

// Stream synchronization and output
pub mod sink;
pub mod sync;

pub use annotate::{hotspot_label, mark_reading, LabelStyle, MarkerStyle, PointReading, PointStyle};
pub use composite::{blend, composite, CompositeStyle};
pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use field::ScalarField;
pub use frame::{Frame, PixelFormat};
pub use pipeline::{render, Pipeline, Rendered};
pub use processing::colormap::{colorize, ColormapKind, Palette};
pub use processing::hotspot::{locate, Hotspot, HotspotLocation};
pub use processing::normalize::{normalize, Normalized, V_MAX};
pub use processing::resample::resample;
pub use sink::{FnSink, PngSequenceSink, Sink};
pub use sync::{FieldInput, FrameInput, SyncState, SyncStats, Synchronizer, TickOutcome};
