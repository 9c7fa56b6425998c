use std::path::PathBuf;

use crate::limits::*;
use crate::model::{parse_hhmm, OperatingHours, RangeError, Room};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {source}")]
    Hours {
        var: &'static str,
        #[source]
        source: RangeError,
    },
    #[error("{var}: not a valid port: {value:?}")]
    Port { var: &'static str, value: String },
    #[error("reading rooms file {}: {source}", path.display())]
    RoomsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing rooms file {}: {source}", path.display())]
    RoomsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Process configuration, read from `AGORA_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub hours: OperatingHours,
    pub rooms: Vec<Room>,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let start = minutes_var(&lookup, "AGORA_DAY_START", DEFAULT_DAY_START)?;
        let end = minutes_var(&lookup, "AGORA_DAY_END", DEFAULT_DAY_END)?;
        let hours = OperatingHours::new(start, end).map_err(|source| ConfigError::Hours {
            var: "AGORA_DAY_START/AGORA_DAY_END",
            source,
        })?;

        let metrics_port = match lookup("AGORA_METRICS_PORT") {
            Some(value) => Some(value.parse::<u16>().map_err(|_| ConfigError::Port {
                var: "AGORA_METRICS_PORT",
                value,
            })?),
            None => None,
        };

        let rooms = match lookup("AGORA_ROOMS_FILE") {
            Some(path) => load_rooms(PathBuf::from(path))?,
            None => Room::agora_defaults(),
        };

        Ok(Self {
            hours,
            rooms,
            metrics_port,
        })
    }
}

fn minutes_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(var) {
        Some(value) => parse_hhmm(value.trim()).map_err(|source| ConfigError::Hours { var, source }),
        None => Ok(default),
    }
}

/// Rooms from a JSON array of `{"id", "name", "capacity"}` objects.
pub fn load_rooms(path: PathBuf) -> Result<Vec<Room>, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::RoomsIo {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::RoomsParse { path, source })
}
