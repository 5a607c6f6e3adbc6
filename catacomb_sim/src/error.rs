// Error types for load-time validation and config parsing.
//
// Nothing that runs inside a tick returns one of these. Geometry misses are
// `Option<i32>` sentinels, a full slot pool is a `bool`, and a creature that
// lost its slot mid-tick is a silent no-op. The errors here only come out of
// `CoreConfig::from_json`/`load` and `Level::new`, before the first tick.
//
// See also: `config.rs`, `level.rs`.

use thiserror::Error;

/// Failure to read or accept a `CoreConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Level data that cannot be loaded because it refers to things that do not
/// exist or disagrees with itself on sizes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("room {room} sector {sector} references box {box_id}, but the level has {box_count} boxes")]
    SectorBoxOutOfRange {
        room: u16,
        sector: usize,
        box_id: u16,
        box_count: usize,
    },

    #[error("room {room} has {actual} sectors, expected {expected} for its size")]
    SectorCountMismatch {
        room: u16,
        expected: usize,
        actual: usize,
    },

    #[error("zone table {table} has {actual} entries, expected one per box ({expected})")]
    ZoneTableLength {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("box {from} lists overlap with unknown box {to}")]
    UnknownOverlap { from: u16, to: u16 },

    #[error("room {room} links to unknown room {target}")]
    UnknownRoomLink { room: u16, target: u16 },

    #[error("room {room} static mesh {index} references unknown static info {static_id}")]
    UnknownStaticInfo {
        room: u16,
        index: usize,
        static_id: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_ids() {
        let err = LevelError::UnknownOverlap { from: 3, to: 99 };
        assert_eq!(err.to_string(), "box 3 lists overlap with unknown box 99");

        let err = ConfigError::Invalid {
            field: "max_creatures",
            reason: "must be at least 1".into(),
        };
        assert!(err.to_string().contains("max_creatures"));
    }

    #[test]
    fn json_errors_convert() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: ConfigError = parse.unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
