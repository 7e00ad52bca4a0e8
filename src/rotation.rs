use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, de};

/// Parse a byte size with an optional unit (K/M/G, case-insensitive).
/// A bare number is a count of bytes.
fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let Some(last) = s.chars().last() else {
        return Err("empty size string".to_string());
    };

    let (num_str, multiplier) = if last.is_alphabetic() {
        let multiplier = match last.to_ascii_uppercase() {
            'K' => 1024,
            'M' => 1024 * 1024,
            'G' => 1024 * 1024 * 1024,
            unit => return Err(format!("invalid unit: {}, supported: K/M/G", unit)),
        };
        (&s[..s.len() - last.len_utf8()], multiplier)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {}", s))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| "size too large".to_string())
}

/// A byte size given either as a plain integer or as a string with units.
///
/// Negative integers survive deserialization so that validation can report
/// them with the offending handler's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteSize(pub i64);

impl Serialize for ByteSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SizeValue {
            Number(i64),
            String(String),
        }

        match SizeValue::deserialize(deserializer)? {
            SizeValue::Number(n) => Ok(ByteSize(n)),
            SizeValue::String(s) => {
                let bytes = parse_size(&s).map_err(de::Error::custom)?;
                i64::try_from(bytes)
                    .map(ByteSize)
                    .map_err(|_| de::Error::custom("size too large"))
            }
        }
    }
}

/// Size-based rotation settings for a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationPolicy {
    /// Rotate before a write would push the file past this many bytes.
    /// Zero disables rotation.
    pub max_bytes: u64,
    /// Number of numbered backups to keep. Zero disables rotation.
    pub backup_count: usize,
}

impl RotationPolicy {
    /// Create a rotation policy.
    pub fn new(max_bytes: u64, backup_count: usize) -> Self {
        Self {
            max_bytes,
            backup_count,
        }
    }

    /// A policy that never rotates.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether rotation is enabled at all. Both a size limit and at least
    /// one backup are required; otherwise the file just grows.
    pub fn is_enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }

    /// Whether writing `incoming` bytes onto a file of `current` bytes
    /// requires a rotation first. An empty file is never rotated, so an
    /// oversized record still lands somewhere.
    pub fn should_rotate(&self, current: u64, incoming: usize) -> bool {
        self.is_enabled() && current > 0 && current + incoming as u64 > self.max_bytes
    }

    /// Shift the backup chain for `base`.
    ///
    /// `base.N-1 -> base.N`, ..., `base -> base.1`; the backup numbered
    /// `backup_count` is discarded. Does nothing when rotation is disabled.
    /// The caller must have closed `base`.
    pub fn rotate(&self, base: &Path) -> io::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        remove_if_exists(&backup_path(base, self.backup_count))?;

        for i in (1..self.backup_count).rev() {
            let from = backup_path(base, i);
            if from.exists() {
                std::fs::rename(&from, backup_path(base, i + 1))?;
            }
        }

        if base.exists() {
            std::fs::rename(base, backup_path(base, 1))?;
        }

        Ok(())
    }
}

/// Path of backup number `index` for `base` (`app.log` -> `app.log.2`).
pub fn backup_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("5K"), Ok(5 * 1024));
        assert_eq!(parse_size("2m"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Ok(1024 * 1024 * 1024));
        assert!(parse_size("").is_err());
        assert!(parse_size("10X").is_err());
        assert!(parse_size("abcK").is_err());
    }

    #[test]
    fn test_byte_size_deserialize() {
        let size: ByteSize = serde_json::from_str("10485760").unwrap();
        assert_eq!(size, ByteSize(10 * 1024 * 1024));
        let size: ByteSize = serde_json::from_str("\"10M\"").unwrap();
        assert_eq!(size, ByteSize(10 * 1024 * 1024));
        let size: ByteSize = serde_json::from_str("-1").unwrap();
        assert_eq!(size, ByteSize(-1));
        assert!(serde_json::from_str::<ByteSize>("\"ten\"").is_err());
    }

    #[test]
    fn test_should_rotate() {
        let policy = RotationPolicy::new(100, 2);
        assert!(!policy.should_rotate(0, 500));
        assert!(!policy.should_rotate(60, 40));
        assert!(policy.should_rotate(60, 41));
        assert!(!RotationPolicy::never().should_rotate(1_000_000, 1));
        assert!(!RotationPolicy::new(100, 0).should_rotate(1_000_000, 1));
        assert!(!RotationPolicy::new(0, 5).should_rotate(1_000_000, 1));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("logs/info.log"), 3),
            PathBuf::from("logs/info.log.3")
        );
    }

    #[test]
    fn test_rotate_shifts_and_discards() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        let policy = RotationPolicy::new(10, 2);

        std::fs::write(&base, "first").unwrap();
        policy.rotate(&base).unwrap();
        std::fs::write(&base, "second").unwrap();
        policy.rotate(&base).unwrap();
        std::fs::write(&base, "third").unwrap();
        policy.rotate(&base).unwrap();

        assert!(!base.exists());
        assert_eq!(std::fs::read_to_string(backup_path(&base, 1)).unwrap(), "third");
        assert_eq!(std::fs::read_to_string(backup_path(&base, 2)).unwrap(), "second");
        assert!(!backup_path(&base, 3).exists());
    }

    #[test]
    fn test_rotate_without_backups_keeps_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        std::fs::write(&base, "data").unwrap();

        RotationPolicy::new(10, 0).rotate(&base).unwrap();

        assert_eq!(std::fs::read_to_string(&base).unwrap(), "data");
        assert!(!backup_path(&base, 1).exists());
    }
}
