//! Core composition.
//!
//! The console contributes two filtered layers sharing one formatter
//! configuration:
//! - stdout: `INFO`, plus `DEBUG` outside product mode
//! - stderr: `WARN` and `ERROR`
//!
//! Every topic contributes one unfiltered layer. All layers are stacked on
//! a single registry and wrapped in a [`Dispatch`].

use tracing::{Dispatch, Level, Metadata};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, Layer};

use crate::domain::errors::SinkError;
use crate::domain::models::Mode;
use crate::infrastructure::config::ConsoleWriters;
use crate::infrastructure::logging::{BoxedLayer, Destination};

/// Stdout takes `INFO`, and `DEBUG` unless in product mode.
pub fn stdout_enabled(mode: Mode, level: Level) -> bool {
    level == Level::INFO || (level == Level::DEBUG && mode != Mode::Product)
}

/// Stderr takes everything more severe than `INFO`.
pub fn stderr_enabled(level: Level) -> bool {
    level < Level::INFO
}

/// The stdout and stderr layers for `mode`.
pub fn console_layers(mode: Mode, json_on_product: bool, writers: ConsoleWriters) -> Vec<BoxedLayer> {
    let format = ConsoleFormat {
        ansi: mode == Mode::Develop,
        json: mode == Mode::Product && json_on_product,
    };
    vec![
        format.layer(writers.stdout, move |meta| stdout_enabled(mode, *meta.level())),
        format.layer(writers.stderr, |meta| stderr_enabled(*meta.level())),
    ]
}

#[derive(Debug, Clone, Copy)]
struct ConsoleFormat {
    ansi: bool,
    json: bool,
}

impl ConsoleFormat {
    fn layer<F>(self, writer: BoxMakeWriter, enabled: F) -> BoxedLayer
    where
        F: Fn(&Metadata<'_>) -> bool + Send + Sync + 'static,
    {
        if self.json {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(filter_fn(enabled))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(self.ansi)
                .with_writer(writer)
                .with_filter(filter_fn(enabled))
                .boxed()
        }
    }
}

/// The layer for one opened topic.
///
/// A hijacking destination in first position is used as is and the rest
/// is discarded. Otherwise every destination must be a stream; the streams
/// are teed into one plain-text layer. No destinations means no layer.
pub fn topic_layer(destinations: Vec<Destination>) -> Result<Option<BoxedLayer>, SinkError> {
    let mut writer: Option<BoxMakeWriter> = None;
    for (index, destination) in destinations.into_iter().enumerate() {
        match destination {
            Destination::Hijack(layer) if index == 0 => return Ok(Some(layer)),
            Destination::Hijack(_) => return Err(SinkError::MixedDestinations(index)),
            Destination::Stream(stream) => {
                writer = Some(match writer.take() {
                    Some(previous) => BoxMakeWriter::new(previous.and(stream)),
                    None => stream,
                });
            }
        }
    }
    Ok(writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer).boxed()))
}

/// Stack the layers on a registry.
pub fn compose(layers: Vec<BoxedLayer>) -> Dispatch {
    Dispatch::new(tracing_subscriber::registry().with(layers))
}
