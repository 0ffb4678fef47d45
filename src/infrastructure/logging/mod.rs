//! Sink infrastructure
//!
//! - Address dispatch and the scheme registry
//! - Size-rotated files (`rolling-file`)
//! - Batched remote ingestion (`log-ingest`)

pub mod batch_sender;
pub mod ingest;
pub mod rolling_file;
pub mod rotation;
pub mod sink_registry;

pub use batch_sender::{BatchConfig, BatchSender, IngestRecord, SenderStats};
pub use ingest::{IngestLayer, IngestProvider};
pub use rolling_file::RollingFileProvider;
pub use rotation::{RollingFile, RotationPolicy};
pub use sink_registry::{BoxedLayer, Closer, Destination, OpenedSink, SinkRegistry};
