//! Rolling-file backend: provider and sink opener.
//!
//! Address format:
//! `rolling-file://localhost?base=<dir>&path=<file>&maxSize=<MB>&maxBackups=<n>&maxAge=<days>`

use std::path::{Component, Path, PathBuf};

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use url::Url;

use super::rotation::{RollingFile, RotationPolicy};
use super::sink_registry::OpenedSink;
use crate::domain::errors::{LogError, ProviderError, SinkError};
use crate::domain::ports::{ScopedParams, TopicProvider};
use crate::infrastructure::config::Options;

pub const SCHEME: &str = "rolling-file";

const PARAM_BASE: &str = "base";
const PARAM_PATH: &str = "path";
const PARAM_MAX_SIZE: &str = "maxSize";
const PARAM_MAX_BACKUPS: &str = "maxBackups";
const PARAM_MAX_AGE: &str = "maxAge";

const CONFIG_PATH: &str = "Path";
const CONFIG_MAX_SIZE: &str = "MaxSize";
const CONFIG_MAX_BACKUPS: &str = "MaxBackups";
const CONFIG_MAX_AGE: &str = "MaxAge";

/// Generates `rolling-file` addresses rooted at a base directory.
#[derive(Debug, Clone)]
pub struct RollingFileProvider {
    name: Option<String>,
    base: PathBuf,
}

impl RollingFileProvider {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            base: base.into(),
        }
    }

    /// Register the same backend under another provider name.
    #[must_use]
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            base: self.base.clone(),
        }
    }
}

impl TopicProvider for RollingFileProvider {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(SCHEME)
    }

    fn generate(&self, params: &ScopedParams<'_>) -> Result<String, ProviderError> {
        if self.base.as_os_str().is_empty() {
            return Err(ProviderError::Unconfigured {
                provider: self.name().to_string(),
                reason: format!("unspecified log base path `{PARAM_BASE}`"),
            });
        }

        let mut address = Url::parse(&format!("{SCHEME}://localhost")).map_err(|e| {
            ProviderError::InvalidParam {
                key: PARAM_BASE.to_string(),
                reason: e.to_string(),
            }
        })?;
        {
            let mut query = address.query_pairs_mut();
            query.append_pair(PARAM_BASE, &self.base.to_string_lossy());
            query.append_pair(PARAM_PATH, &params.require(CONFIG_PATH)?);
            for (config, param) in [
                (CONFIG_MAX_SIZE, PARAM_MAX_SIZE),
                (CONFIG_MAX_BACKUPS, PARAM_MAX_BACKUPS),
                (CONFIG_MAX_AGE, PARAM_MAX_AGE),
            ] {
                if let Some(value) = params.get(config) {
                    query.append_pair(param, &value);
                }
            }
        }
        Ok(address.into())
    }
}

/// Register the provider and the `rolling-file` opener on `options`.
pub fn register(options: &mut Options, base: impl Into<PathBuf>) -> Result<(), LogError> {
    options.register_provider(RollingFileProvider::new(base))?;
    options.register_sink(SCHEME, open)
}

/// Open a `rolling-file` address.
pub fn open(address: &Url) -> Result<OpenedSink, SinkError> {
    let query_value = |name: &str| {
        address
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    };

    let base = query_value(PARAM_BASE).ok_or_else(|| SinkError::MissingArg(PARAM_BASE.to_string()))?;
    let path = query_value(PARAM_PATH).ok_or_else(|| SinkError::MissingArg(PARAM_PATH.to_string()))?;

    let parse = |name: &str| -> Result<u32, SinkError> {
        query_value(name).map_or(Ok(0), |value| {
            value.trim().parse().map_err(|e: std::num::ParseIntError| SinkError::InvalidArg {
                arg: name.to_string(),
                reason: e.to_string(),
            })
        })
    };
    let policy = RotationPolicy {
        max_size_mb: parse(PARAM_MAX_SIZE)?,
        max_backups: parse(PARAM_MAX_BACKUPS)?,
        max_age_days: parse(PARAM_MAX_AGE)?,
    };

    let file = RollingFile::open(target_path(Path::new(&base), Path::new(&path)), policy)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    Ok(OpenedSink::stream(BoxMakeWriter::new(writer)).with_closer(move || {
        drop(guard);
        Ok(())
    }))
}

/// `target` when absolute, otherwise `base/target`, normalised lexically.
pub fn target_path(base: &Path, target: &Path) -> PathBuf {
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    };
    let mut clean = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !clean.pop() {
                    clean.push(component);
                }
            }
            other => clean.push(other),
        }
    }
    clean
}
