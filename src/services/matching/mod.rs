//! Snap GPS trajectories onto a road network using an external map matching service
use crate::config::{FromServiceConfig, ServiceConfig};
use crate::gps::{QueryBatch, Trajectory};
use crate::options::MatchOptions;
use crate::tables::{shape_batch, RouteTable, TracepointTable};
use crate::Error;
use log::{debug, info};
mod osrm;
pub mod response;
pub use osrm::{parse_match_response, OsrmServer};
pub use response::MatchResponse;

/// trait that defines how a single batch of points is matched by an external service
pub trait MapMatchingService {
    /// Send one batch to the service and return its successful response.
    ///
    /// Implementations must return an `Error::ServerResponse` for any reply that is not a
    /// successful match so callers never see a failed response body.
    fn match_batch(
        &self,
        batch: &QueryBatch<'_>,
        options: &MatchOptions,
    ) -> Result<MatchResponse, Error>;

    /// Describe the request that would be sent for the batch without sending it
    fn describe_request(&self, batch: &QueryBatch<'_>, options: &MatchOptions) -> String;
}

/// Create a matching service from the configuration's handler name
pub fn new_matching_handler(config: &ServiceConfig) -> Result<Box<dyn MapMatchingService>, Error> {
    match config.handler() {
        "osrm" => Ok(Box::new(OsrmServer::from_config(config)?)),
        _ => Err(Error::UnknownServiceHandler(format!(
            "unknown map matching handler: {}",
            config.handler()
        ))),
    }
}

/// Match a whole trajectory, splitting it into requests of at most `max_matching_size` points.
///
/// Batches are sent one after another and their rows are concatenated in order. The first
/// failing batch aborts the call and rows from earlier batches are dropped.
pub fn mapmatch(
    service: &dyn MapMatchingService,
    trajectory: &Trajectory,
    max_matching_size: usize,
    options: &MatchOptions,
) -> Result<(TracepointTable, RouteTable), Error> {
    options.validate()?;
    let batches = trajectory.batches(max_matching_size)?;
    info!(
        "Matching {} points in {} request(s)",
        trajectory.len(),
        batches.len()
    );

    let mut tracepoints = TracepointTable::new();
    let mut routes = RouteTable::new();
    for batch in &batches {
        debug!(
            "Requesting match for batch {} (points {}..{})",
            batch.index(),
            batch.offset(),
            batch.offset() + batch.len()
        );
        let response = service.match_batch(batch, options)?;
        let (tps, rtes) = shape_batch(batch, response, options.geometries)?;
        debug!(
            "Batch {} matched {} of {} points",
            batch.index(),
            tps.iter().filter(|tp| tp.is_matched()).count(),
            tps.len()
        );
        tracepoints.append(tps);
        routes.append(rtes);
    }

    Ok((tracepoints, routes))
}

/// Return the request each batch of the trajectory would produce, without any network I/O
pub fn plan_requests(
    service: &dyn MapMatchingService,
    trajectory: &Trajectory,
    max_matching_size: usize,
    options: &MatchOptions,
) -> Result<Vec<String>, Error> {
    options.validate()?;
    Ok(trajectory
        .batches(max_matching_size)?
        .iter()
        .map(|batch| service.describe_request(batch, options))
        .collect())
}
