use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Ordered log severity.
///
/// The numeric values follow the conventional 10-step scale so documents may
/// use either names or numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Upper-case name as it appears in formatted records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Numeric level (10, 20, 30, 40, 50).
    pub fn number(&self) -> u8 {
        match self {
            Self::Debug => 10,
            Self::Info => 20,
            Self::Warning => 30,
            Self::Error => 40,
            Self::Critical => 50,
        }
    }

    /// Look up a severity by its numeric level.
    pub fn from_number(n: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| i64::from(s.number()) == n)
    }

    /// Map a `tracing` level. `critical` marks an error event as critical.
    pub fn from_tracing(level: &tracing::Level, critical: bool) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::ERROR if critical => Self::Critical,
            tracing::Level::ERROR => Self::Error,
        }
    }

    /// Verbosity 0..=3 to severity: 0 errors only, 3 everything.
    pub fn from_verbosity(verbosity: u8) -> Option<Self> {
        match verbosity {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Info),
            3 => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" | "FATAL" => Ok(Self::Critical),
            other => match other.parse::<i64>() {
                Ok(n) => Self::from_number(n).ok_or_else(|| format!("unknown level number: {}", n)),
                Err(_) => Err(format!("unknown level: {}", s)),
            },
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LevelInput {
            Number(i64),
            Name(String),
        }

        match LevelInput::deserialize(deserializer)? {
            LevelInput::Number(n) => Severity::from_number(n)
                .ok_or_else(|| de::Error::custom(format!("unknown level number: {}", n))),
            LevelInput::Name(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_parse_names_and_numbers() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("fatal".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("40".parse::<Severity>().unwrap(), Severity::Error);
        assert!("verbose".parse::<Severity>().is_err());
        assert!("15".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_deserialize() {
        let s: Severity = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(s, Severity::Critical);
        let s: Severity = serde_json::from_str("20").unwrap();
        assert_eq!(s, Severity::Info);
        assert!(serde_json::from_str::<Severity>("25").is_err());
    }

    #[test]
    fn test_from_tracing() {
        assert_eq!(
            Severity::from_tracing(&tracing::Level::TRACE, false),
            Severity::Debug
        );
        assert_eq!(
            Severity::from_tracing(&tracing::Level::WARN, false),
            Severity::Warning
        );
        assert_eq!(
            Severity::from_tracing(&tracing::Level::ERROR, true),
            Severity::Critical
        );
        // only errors can be promoted
        assert_eq!(
            Severity::from_tracing(&tracing::Level::INFO, true),
            Severity::Info
        );
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(Severity::from_verbosity(0), Some(Severity::Error));
        assert_eq!(Severity::from_verbosity(3), Some(Severity::Debug));
        assert_eq!(Severity::from_verbosity(4), None);
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(format!("{:<8}|", Severity::Info), "INFO    |");
    }
}
