//! Service configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::planner::RouteConfig;
use crate::rainfall::{GridSpec, RainfallConfig};

/// Default listen address.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default per-request deadline.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Errors building the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything needed to start the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Road network JSON file.
    pub graph_path: PathBuf,

    /// Address to listen on.
    pub bind: SocketAddr,

    pub rainfall: RainfallConfig,
    pub grid: GridSpec,
    pub route: RouteConfig,

    /// Root of the occurrence report tree, if served.
    pub occurrences_dir: Option<PathBuf>,

    /// Bound on a single request's processing time.
    pub deadline: Duration,
}

impl ServiceConfig {
    /// Read configuration from `RAIN_ROUTER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let graph_path = get("RAIN_ROUTER_GRAPH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("RAIN_ROUTER_GRAPH"))?;

        let bind = parse_var(
            "RAIN_ROUTER_BIND",
            &get("RAIN_ROUTER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
        )?;

        let mut rainfall = RainfallConfig::default();
        if let Some(prefix) = get("RAIN_ROUTER_RAINFALL_PREFIX") {
            rainfall.source_prefix = prefix;
        }
        if let Some(dir) = get("RAIN_ROUTER_RAINFALL_CACHE_DIR") {
            rainfall = rainfall.with_cache_dir(dir);
        }
        if let Some(secs) = get("RAIN_ROUTER_RAINFALL_TIMEOUT_SECS") {
            let secs: u64 = parse_var("RAIN_ROUTER_RAINFALL_TIMEOUT_SECS", &secs)?;
            rainfall = rainfall.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = get("RAIN_ROUTER_RAINFALL_RETRIES") {
            rainfall.retries = parse_var("RAIN_ROUTER_RAINFALL_RETRIES", &retries)?;
        }

        let grid = match get("RAIN_ROUTER_GRID") {
            Some(value) => parse_grid(&value)?,
            None => GridSpec::default(),
        };

        let mut route = RouteConfig::default();
        if let Some(mm) = get("RAIN_ROUTER_IMPASSABLE_MM") {
            route = route.with_impassable_above(parse_var("RAIN_ROUTER_IMPASSABLE_MM", &mm)?);
        }

        let deadline = match get("RAIN_ROUTER_DEADLINE_SECS") {
            Some(secs) => Duration::from_secs(parse_var("RAIN_ROUTER_DEADLINE_SECS", &secs)?),
            None => DEFAULT_DEADLINE,
        };

        Ok(Self {
            graph_path,
            bind,
            rainfall,
            grid,
            route,
            occurrences_dir: get("RAIN_ROUTER_OCCURRENCES_DIR").map(PathBuf::from),
            deadline,
        })
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse `lat0,lon0,dlat,dlon`.
fn parse_grid(value: &str) -> Result<GridSpec, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "RAIN_ROUTER_GRID",
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(&e.to_string()))?;

    match parts[..] {
        [lat0, lon0, dlat, dlon] => {
            if !parts.iter().all(|p| p.is_finite()) {
                return Err(invalid("values must be finite"));
            }
            if dlat == 0.0 || dlon == 0.0 {
                return Err(invalid("cell steps must be non-zero"));
            }
            Ok(GridSpec::new(lat0, lon0, dlat, dlon))
        }
        _ => Err(invalid("expected lat0,lon0,dlat,dlon")),
    }
}
