//! Flat records built from match responses and the tables that collect them
use crate::gps::QueryBatch;
use crate::options::Geometries;
use crate::services::matching::response::{Geometry, Leg, MatchResponse, Matching};
use crate::{decode_polyline, Error};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::slice;

/// One input point together with the location the server snapped it to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TracepointRecord {
    /// index of the request (batch) the point was sent in
    pub query_idx: usize,
    /// index of the point inside its request
    pub tp_idx: usize,
    /// index of the point in the full input trajectory
    pub point_idx: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<i64>,
    pub snap_latitude: Option<f64>,
    pub snap_longitude: Option<f64>,
    pub matchings_index: Option<usize>,
    pub waypoint_index: Option<usize>,
    pub alternatives_count: Option<usize>,
    /// distance in meters between the input point and its snapped location
    pub distance: Option<f64>,
    /// name of the street the point was snapped to
    pub name: Option<String>,
}

impl TracepointRecord {
    pub fn is_matched(&self) -> bool {
        self.matchings_index.is_some()
    }
}

/// A routed segment between two points of the same request
///
/// Pairs of consecutive points the server did not connect still get a row, with all of the leg
/// fields left empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteRecord {
    pub query_idx: usize,
    /// request local index of the tracepoint the leg starts at
    pub from_tp: usize,
    /// request local index of the tracepoint the leg ends at
    pub to_tp: usize,
    pub from_point: usize,
    pub to_point: usize,
    /// index of the matching inside the request
    pub route_idx: Option<usize>,
    /// index of the leg inside the matching
    pub leg_idx: Option<usize>,
    pub distance: Option<f64>,
    pub duration: Option<f64>,
    pub weight: Option<f64>,
    /// confidence of the matching the leg belongs to
    pub confidence: Option<f64>,
    /// adjacent OSM node id pairs along the leg
    pub node_pairs: Vec<(u64, u64)>,
    /// length in meters of each node pair segment
    pub distances: Vec<f64>,
    /// leg geometry as `[longitude, latitude]` pairs
    pub coordinates: Vec<[f64; 2]>,
}

impl RouteRecord {
    fn unrouted(batch: &QueryBatch<'_>, from_tp: usize, to_tp: usize) -> Self {
        RouteRecord {
            query_idx: batch.index(),
            from_tp,
            to_tp,
            from_point: batch.offset() + from_tp,
            to_point: batch.offset() + to_tp,
            route_idx: None,
            leg_idx: None,
            distance: None,
            duration: None,
            weight: None,
            confidence: None,
            node_pairs: Vec::new(),
            distances: Vec::new(),
            coordinates: Vec::new(),
        }
    }

    pub fn is_routed(&self) -> bool {
        self.leg_idx.is_some()
    }
}

/// An ordered collection of records
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table<R> {
    rows: Vec<R>,
}

pub type TracepointTable = Table<TracepointRecord>;
pub type RouteTable = Table<RouteRecord>;

impl<R> Table<R> {
    pub fn new() -> Self {
        Table { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn iter(&self) -> slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append all rows of another table, keeping their order
    pub fn append(&mut self, other: Table<R>) {
        self.rows.extend(other.rows);
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Table::new()
    }
}

impl<R> From<Vec<R>> for Table<R> {
    fn from(rows: Vec<R>) -> Self {
        Table { rows }
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<R> IntoIterator for Table<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Turn the server's answer for one batch into tracepoint and route rows.
///
/// The response must already have been checked for a successful status code.
pub fn shape_batch(
    batch: &QueryBatch<'_>,
    response: MatchResponse,
    geometries: Geometries,
) -> Result<(TracepointTable, RouteTable), Error> {
    if response.tracepoints.len() != batch.len() {
        return Err(Error::server_response(
            batch.index(),
            None,
            Some(response.code),
            &format!(
                "expected {} tracepoints but the server returned {}",
                batch.len(),
                response.tracepoints.len()
            ),
        ));
    }

    // map (matching, waypoint) to the tracepoint index so legs can be located
    let mut waypoints = HashMap::new();
    let mut tracepoints = Vec::with_capacity(batch.len());
    for (tp_idx, (loc, tp)) in batch
        .locations()
        .iter()
        .zip(response.tracepoints)
        .enumerate()
    {
        let mut record = TracepointRecord {
            query_idx: batch.index(),
            tp_idx,
            point_idx: batch.offset() + tp_idx,
            latitude: loc.latitude(),
            longitude: loc.longitude(),
            timestamp: loc.timestamp(),
            snap_latitude: None,
            snap_longitude: None,
            matchings_index: None,
            waypoint_index: None,
            alternatives_count: None,
            distance: None,
            name: None,
        };
        if let Some(tp) = tp {
            let key = (tp.matchings_index, tp.waypoint_index);
            if let Some(other) = waypoints.insert(key, tp_idx) {
                return Err(Error::server_response(
                    batch.index(),
                    None,
                    None,
                    &format!(
                        "tracepoints {} and {} both claim waypoint {} of matching {}",
                        other, tp_idx, key.1, key.0
                    ),
                ));
            }
            record.snap_longitude = Some(tp.location[0]);
            record.snap_latitude = Some(tp.location[1]);
            record.matchings_index = Some(tp.matchings_index);
            record.waypoint_index = Some(tp.waypoint_index);
            record.alternatives_count = Some(tp.alternatives_count);
            record.distance = tp.distance;
            record.name = tp.name;
        }
        tracepoints.push(record);
    }

    let mut routes = BTreeMap::new();
    for (route_idx, matching) in response.matchings.iter().enumerate() {
        for (leg_idx, leg) in matching.legs.iter().enumerate() {
            let lookup = |waypoint_idx: usize| {
                waypoints
                    .get(&(route_idx, waypoint_idx))
                    .copied()
                    .ok_or_else(|| {
                        Error::server_response(
                            batch.index(),
                            None,
                            None,
                            &format!(
                                "leg {} of matching {} references waypoint {} with no tracepoint",
                                leg_idx, route_idx, waypoint_idx
                            ),
                        )
                    })
            };
            let from_tp = lookup(leg_idx)?;
            let to_tp = lookup(leg_idx + 1)?;
            let record = route_record(
                batch,
                matching,
                leg,
                (route_idx, leg_idx),
                (from_tp, to_tp),
                geometries,
            )?;
            if routes.insert((from_tp, to_tp), record).is_some() {
                return Err(Error::server_response(
                    batch.index(),
                    None,
                    None,
                    &format!(
                        "more than one leg connects tracepoints {} and {}",
                        from_tp, to_tp
                    ),
                ));
            }
        }
    }
    for tp_idx in 1..batch.len() {
        routes
            .entry((tp_idx - 1, tp_idx))
            .or_insert_with(|| RouteRecord::unrouted(batch, tp_idx - 1, tp_idx));
    }

    Ok((
        Table::from(tracepoints),
        Table::from(routes.into_iter().map(|(_, r)| r).collect::<Vec<_>>()),
    ))
}

fn route_record(
    batch: &QueryBatch<'_>,
    matching: &Matching,
    leg: &Leg,
    (route_idx, leg_idx): (usize, usize),
    (from_tp, to_tp): (usize, usize),
    geometries: Geometries,
) -> Result<RouteRecord, Error> {
    let mut record = RouteRecord::unrouted(batch, from_tp, to_tp);
    record.route_idx = Some(route_idx);
    record.leg_idx = Some(leg_idx);
    record.distance = Some(leg.distance);
    record.duration = Some(leg.duration);
    record.weight = leg.weight;
    record.confidence = Some(matching.confidence);
    if let Some(annotation) = &leg.annotation {
        record.node_pairs = annotation.nodes.windows(2).map(|w| (w[0], w[1])).collect();
        record.distances = annotation
            .distance
            .iter()
            .map(|d| (d * 1000.0).round() / 1000.0)
            .collect();
    }
    for step in &leg.steps {
        let coords = step_coordinates(&step.geometry, geometries)
            .map_err(|msg| Error::server_response(batch.index(), None, None, &msg))?;
        record.coordinates.extend(coords);
    }
    // the last point of a step is repeated as the first point of the next one
    record.coordinates.dedup();
    Ok(record)
}

fn step_coordinates(geometry: &Geometry, requested: Geometries) -> Result<Vec<[f64; 2]>, String> {
    match (geometry, requested) {
        (Geometry::Encoded(line), Geometries::Polyline) => decode_polyline(line, 5),
        (Geometry::Encoded(line), Geometries::Polyline6) => decode_polyline(line, 6),
        (Geometry::Encoded(_), Geometries::GeoJson) => {
            Err("expected GeoJSON step geometry but got an encoded polyline".to_string())
        }
        (Geometry::GeoJson { kind, coordinates }, _) => {
            if kind != "LineString" {
                return Err(format!("unexpected step geometry type: {}", kind));
            }
            serde_json::from_value(coordinates.clone())
                .map_err(|e| format!("invalid LineString coordinates: {}", e))
        }
    }
}
