//! Batch GPS trajectories through the match service of an OSRM server and reshape the
//! replies into a table of snapped tracepoints and a table of routed legs.
//!
//! ```no_run
//! use osrm_match_client::mapmatch_custom;
//!
//! let (tracepoints, routes) = mapmatch_custom(
//!     "http://127.0.0.1:5000",
//!     &[40.7128, 40.7130, 40.7135],
//!     &[-74.0060, -74.0058, -74.0055],
//!     &[1_600_000_000, 1_600_000_005, 1_600_000_010],
//!     100,
//!     None,
//! )?;
//! assert_eq!(tracepoints.len(), 3);
//! # Ok::<(), osrm_match_client::Error>(())
//! ```
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
mod error;
pub mod gps;
pub mod options;
pub mod services;
pub mod tables;
pub use error::Error;
pub use gps::{decode_polyline, Bearing, Location, QueryBatch, Trajectory};
pub use options::MatchOptions;
pub use services::{mapmatch, plan_requests, MapMatchingService, OsrmServer};
pub use tables::{RouteRecord, RouteTable, Table, TracepointRecord, TracepointTable};

/// Match parallel latitude, longitude and timestamp arrays against the OSRM server at
/// `server_url`, sending at most `max_matching_size` points per request.
///
/// `timestamps` may be empty when the trace has no timing information. When `options` is
/// `None` the detailed option set is used so that route rows carry node pairs, distances and
/// coordinates. All inputs are validated before the first request is made.
pub fn mapmatch_custom(
    server_url: &str,
    latitudes: &[f64],
    longitudes: &[f64],
    timestamps: &[i64],
    max_matching_size: usize,
    options: Option<&MatchOptions>,
) -> Result<(TracepointTable, RouteTable), Error> {
    let trajectory = Trajectory::from_parts(latitudes, longitudes, timestamps)?;
    if max_matching_size == 0 {
        return Err(Error::InvalidInput(
            "max_matching_size must be at least 1".to_string(),
        ));
    }
    let server = OsrmServer::new(server_url)?;
    let detailed;
    let options = match options {
        Some(opts) => opts,
        None => {
            detailed = MatchOptions::detailed();
            &detailed
        }
    };
    mapmatch(&server, &trajectory, max_matching_size, options)
}
