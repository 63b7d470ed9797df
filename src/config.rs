//! Server Configuration
//!
//! Grid dimensions and transport settings. Values come from defaults or
//! from `MINE_DUEL_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::{DEFAULT_GRID_SIZE, DEFAULT_MINE_COUNT};

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Grid has no cells.
    #[error("grid side length must be at least 1")]
    EmptyGrid,

    /// Mine count leaves no safe cell (or overflows the grid).
    #[error("mine count {mine_count} must be below {cells} cells")]
    TooManyMines {
        /// Requested mines.
        mine_count: usize,
        /// Cells available (side length squared).
        cells: usize,
    },

    /// Grid side exceeds the supported maximum.
    #[error("grid side length {side_length} exceeds maximum {max}")]
    GridTooLarge {
        /// Requested side length.
        side_length: usize,
        /// Largest accepted side length.
        max: usize,
    },

    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Largest accepted grid side. Every session allocates side² cells twice.
pub const MAX_GRID_SIDE: usize = 256;

/// Grid generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Side length of the square grid.
    pub side_length: usize,
    /// Mines placed per grid.
    pub mine_count: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            side_length: DEFAULT_GRID_SIZE,
            mine_count: DEFAULT_MINE_COUNT,
        }
    }
}

impl GridConfig {
    /// Create a grid config.
    pub const fn new(side_length: usize, mine_count: usize) -> Self {
        Self { side_length, mine_count }
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.side_length.saturating_mul(self.side_length)
    }

    /// Reject grids where mine placement could not terminate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side_length == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.side_length > MAX_GRID_SIDE {
            return Err(ConfigError::GridTooLarge {
                side_length: self.side_length,
                max: MAX_GRID_SIDE,
            });
        }
        let cells = self.cell_count();
        if self.mine_count >= cells {
            return Err(ConfigError::TooManyMines {
                mine_count: self.mine_count,
                cells,
            });
        }
        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Per-connection outbound queue depth.
    pub outbound_buffer: usize,
    /// Grid used for every new session.
    pub grid: GridConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            outbound_buffer: 64,
            grid: GridConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_var(&lookup, "MINE_DUEL_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_connections: parse_var(&lookup, "MINE_DUEL_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            outbound_buffer: defaults.outbound_buffer,
            grid: GridConfig {
                side_length: parse_var(&lookup, "MINE_DUEL_GRID_SIZE")?
                    .unwrap_or(defaults.grid.side_length),
                mine_count: parse_var(&lookup, "MINE_DUEL_MINE_COUNT")?
                    .unwrap_or(defaults.grid.mine_count),
            },
        };

        config.grid.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_grid_is_valid() {
        let grid = GridConfig::default();
        assert_eq!(grid.side_length, 5);
        assert_eq!(grid.mine_count, 3);
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn test_rejects_full_grid() {
        let grid = GridConfig::new(2, 4);
        assert_eq!(
            grid.validate(),
            Err(ConfigError::TooManyMines { mine_count: 4, cells: 4 })
        );
        assert!(GridConfig::new(2, 3).validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_grid() {
        assert_eq!(GridConfig::new(0, 0).validate(), Err(ConfigError::EmptyGrid));
    }

    #[test]
    fn test_rejects_oversized_grid() {
        assert!(GridConfig::new(MAX_GRID_SIDE, 1).validate().is_ok());
        assert_eq!(
            GridConfig::new(MAX_GRID_SIDE + 1, 1).validate(),
            Err(ConfigError::GridTooLarge {
                side_length: MAX_GRID_SIDE + 1,
                max: MAX_GRID_SIDE,
            })
        );
    }

    #[test]
    fn test_from_lookup_rejects_huge_grid_size() {
        let result = ServerConfig::from_lookup(lookup_from(&[("MINE_DUEL_GRID_SIZE", "100000")]));
        assert!(matches!(result, Err(ConfigError::GridTooLarge { side_length: 100000, .. })));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MINE_DUEL_BIND_ADDR", "127.0.0.1:9000"),
            ("MINE_DUEL_GRID_SIZE", "8"),
            ("MINE_DUEL_MINE_COUNT", "10"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.grid, GridConfig::new(8, 10));
    }

    #[test]
    fn test_from_lookup_invalid_value() {
        let result = ServerConfig::from_lookup(lookup_from(&[("MINE_DUEL_GRID_SIZE", "five")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { var: "MINE_DUEL_GRID_SIZE", .. })
        ));
    }

    #[test]
    fn test_from_lookup_rejects_bad_grid() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("MINE_DUEL_GRID_SIZE", "3"),
            ("MINE_DUEL_MINE_COUNT", "9"),
        ]));
        assert!(matches!(result, Err(ConfigError::TooManyMines { .. })));
    }
}
