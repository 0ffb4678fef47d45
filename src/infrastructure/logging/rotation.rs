//! Size-based rotating log file
//!
//! Provides a `Write` target that rotates on:
//! - File size limits
//!
//! and prunes backups by:
//! - Backup count
//! - Time-based retention
//!
//! Rotated files are renamed `<stem>-<UTC timestamp>.<ext>` next to the
//! active file.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const MEGABYTE: u64 = 1024 * 1024;
const DEFAULT_MAX_SIZE_MB: u32 = 100;
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6f";

/// Rotation and retention limits. Zero means "use default" for the size
/// and "unlimited" for backups and age.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum size in megabytes before rotation
    pub max_size_mb: u32,
    /// Number of rotated files to keep
    pub max_backups: u32,
    /// Number of days to keep rotated files
    pub max_age_days: u32,
}

impl RotationPolicy {
    fn max_size_bytes(&self) -> u64 {
        let mb = if self.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size_mb
        };
        u64::from(mb) * MEGABYTE
    }
}

/// Log file that rotates itself when it grows past the size limit.
#[derive(Debug)]
pub struct RollingFile {
    path: PathBuf,
    policy: RotationPolicy,
    max_size: u64,
    file: Option<File>,
    size: u64,
}

impl RollingFile {
    /// Open (or create) the active file, creating parent directories.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> io::Result<Self> {
        let mut rolling = Self {
            path: path.into(),
            policy,
            max_size: policy.max_size_bytes(),
            file: None,
            size: 0,
        };
        rolling.open_active()?;
        Ok(rolling)
    }

    /// Override the rotation threshold in bytes.
    #[must_use]
    pub fn with_max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_active(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Rename the active file to a timestamped backup and start a new one.
    pub fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let mut stamp = Utc::now();
        let mut backup = self.backup_path(stamp);
        while backup.exists() {
            stamp += Duration::microseconds(1);
            backup = self.backup_path(stamp);
        }
        fs::rename(&self.path, &backup)?;

        self.open_active()?;
        self.prune()?;
        Ok(())
    }

    fn name_parts(&self) -> (String, Option<String>) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|s| s.to_string_lossy().into_owned());
        (stem, ext)
    }

    fn backup_path(&self, stamp: DateTime<Utc>) -> PathBuf {
        let (stem, ext) = self.name_parts();
        let name = match ext {
            Some(ext) => format!("{stem}-{}.{ext}", stamp.format(BACKUP_TIME_FORMAT)),
            None => format!("{stem}-{}", stamp.format(BACKUP_TIME_FORMAT)),
        };
        self.path.with_file_name(name)
    }

    /// Parse the rotation time out of a backup file name.
    fn backup_time(&self, file_name: &str) -> Option<DateTime<Utc>> {
        let (stem, ext) = self.name_parts();
        let rest = file_name.strip_prefix(&stem)?.strip_prefix('-')?;
        let stamp = match &ext {
            Some(ext) => rest.strip_suffix(ext.as_str())?.strip_suffix('.')?,
            None => rest,
        };
        NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Remove backups beyond the count limit or older than the age limit.
    ///
    /// Returns the number of files deleted.
    pub fn prune(&self) -> io::Result<usize> {
        if self.policy.max_backups == 0 && self.policy.max_age_days == 0 {
            return Ok(0);
        }
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut backups: Vec<(DateTime<Utc>, PathBuf)> = fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let stamp = self.backup_time(&name.to_string_lossy())?;
                Some((stamp, entry.path()))
            })
            .collect();
        backups.sort_by(|a, b| b.0.cmp(&a.0));

        let cutoff = (self.policy.max_age_days > 0)
            .then(|| Utc::now() - Duration::days(i64::from(self.policy.max_age_days)));

        let mut deleted = 0;
        for (index, (stamp, path)) in backups.iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && index >= self.policy.max_backups as usize;
            let too_old = cutoff.is_some_and(|cutoff| *stamp < cutoff);
            if over_count || too_old {
                fs::remove_file(path)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.open_active()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("rolling file is not open"))?;
        let written = file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
