//! Module with GPS specific structures
use crate::Error;
use std::ops::Range;

/// Stores a single trajectory point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// latitude coordinate in degrees
    latitude: f64,
    /// longitude coordinate in degrees
    longitude: f64,
    /// unix timestamp in seconds if available
    timestamp: Option<i64>,
}

impl Location {
    /// Create a location from coordinates provided in degrees
    pub fn new(latitude: f64, longitude: f64, timestamp: Option<i64>) -> Self {
        Location {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Return latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Return longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Return unix timestamp in seconds (if defined)
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn validate(&self, idx: usize) -> Result<(), Error> {
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(Error::InvalidInput(format!(
                "latitude at index {} is out of range: {}",
                idx, self.latitude
            )));
        }
        if !self.longitude.is_finite() || self.longitude.abs() > 180.0 {
            return Err(Error::InvalidInput(format!(
                "longitude at index {} is out of range: {}",
                idx, self.longitude
            )));
        }
        Ok(())
    }
}

/// Limits the search to segments with a given bearing in degrees towards true north
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bearing {
    value: u16,
    range: u16,
}

impl Bearing {
    pub fn new(value: u16, range: u16) -> Result<Self, Error> {
        if value > 360 || range > 180 {
            return Err(Error::InvalidInput(format!(
                "bearing must be within 0-360 with a range of 0-180, got {},{}",
                value, range
            )));
        }
        Ok(Bearing { value, range })
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn range(&self) -> u16 {
        self.range
    }
}

/// An ordered, validated sequence of GPS points plus optional per point hints for the server
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    locations: Vec<Location>,
    bearings: Option<Vec<Bearing>>,
    radiuses: Option<Vec<f64>>,
}

impl Trajectory {
    /// Zip parallel latitude, longitude and timestamp arrays into a trajectory.
    ///
    /// An empty timestamp slice means the trace has no timing information, otherwise it must
    /// have the same length as the coordinates.
    pub fn from_parts(
        latitudes: &[f64],
        longitudes: &[f64],
        timestamps: &[i64],
    ) -> Result<Self, Error> {
        if latitudes.len() != longitudes.len() {
            return Err(Error::InvalidInput(format!(
                "got {} latitudes but {} longitudes",
                latitudes.len(),
                longitudes.len()
            )));
        }
        if !timestamps.is_empty() && timestamps.len() != latitudes.len() {
            return Err(Error::InvalidInput(format!(
                "got {} coordinates but {} timestamps",
                latitudes.len(),
                timestamps.len()
            )));
        }
        let locations = latitudes
            .iter()
            .zip(longitudes)
            .enumerate()
            .map(|(i, (lat, lon))| Location::new(*lat, *lon, timestamps.get(i).copied()))
            .collect();
        Self::new(locations)
    }

    /// Create a trajectory from locations, every location must hold valid coordinates
    pub fn new(locations: Vec<Location>) -> Result<Self, Error> {
        if locations.is_empty() {
            return Err(Error::InvalidInput(
                "a trajectory needs at least one point".to_string(),
            ));
        }
        for (idx, loc) in locations.iter().enumerate() {
            loc.validate(idx)?;
        }
        // the server rejects a request when only some points carry a timestamp
        let stamped = locations.iter().filter(|l| l.timestamp.is_some()).count();
        if stamped != 0 && stamped != locations.len() {
            return Err(Error::InvalidInput(format!(
                "{} of {} points are missing a timestamp",
                locations.len() - stamped,
                locations.len()
            )));
        }
        Ok(Trajectory {
            locations,
            bearings: None,
            radiuses: None,
        })
    }

    /// Attach one bearing per point
    pub fn with_bearings(mut self, bearings: Vec<Bearing>) -> Result<Self, Error> {
        self.check_len("bearings", bearings.len())?;
        self.bearings = Some(bearings);
        Ok(self)
    }

    /// Attach one search radius in meters per point
    pub fn with_radiuses(mut self, radiuses: Vec<f64>) -> Result<Self, Error> {
        self.check_len("radiuses", radiuses.len())?;
        if let Some(idx) = radiuses.iter().position(|r| !r.is_finite() || *r < 0.0) {
            return Err(Error::InvalidInput(format!(
                "radius at index {} must be a non-negative number: {}",
                idx, radiuses[idx]
            )));
        }
        self.radiuses = Some(radiuses);
        Ok(self)
    }

    fn check_len(&self, name: &str, len: usize) -> Result<(), Error> {
        if len != self.locations.len() {
            return Err(Error::InvalidInput(format!(
                "got {} coordinates but {} {}",
                self.locations.len(),
                len,
                name
            )));
        }
        Ok(())
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Split the trajectory into consecutive batches holding at most `max_size` points.
    ///
    /// Batches are filled greedily from the start so only the last one may be short.
    pub fn batches(&self, max_size: usize) -> Result<Vec<QueryBatch<'_>>, Error> {
        if max_size == 0 {
            return Err(Error::InvalidInput(
                "max_matching_size must be at least 1".to_string(),
            ));
        }
        let len = self.locations.len();
        Ok((0..len)
            .step_by(max_size)
            .enumerate()
            .map(|(index, start)| self.batch(index, start..start.saturating_add(max_size).min(len)))
            .collect())
    }

    fn batch(&self, index: usize, range: Range<usize>) -> QueryBatch<'_> {
        QueryBatch {
            index,
            offset: range.start,
            locations: &self.locations[range.clone()],
            bearings: self.bearings.as_ref().map(|b| &b[range.clone()]),
            radiuses: self.radiuses.as_ref().map(|r| &r[range]),
        }
    }
}

/// A contiguous slice of a trajectory that is sent to the server in one request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryBatch<'a> {
    index: usize,
    offset: usize,
    locations: &'a [Location],
    bearings: Option<&'a [Bearing]>,
    radiuses: Option<&'a [f64]>,
}

impl<'a> QueryBatch<'a> {
    /// Position of this batch among all batches of the trajectory
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the first point of the batch within the full trajectory
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn locations(&self) -> &'a [Location] {
        self.locations
    }

    pub fn bearings(&self) -> Option<&'a [Bearing]> {
        self.bearings
    }

    pub fn radiuses(&self) -> Option<&'a [f64]> {
        self.radiuses
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// True when every point of the batch carries a timestamp
    pub fn has_timestamps(&self) -> bool {
        self.locations.iter().all(|l| l.timestamp.is_some())
    }
}

/// Decodes a Google Encoded Polyline into `[longitude, latitude]` pairs.
///
/// `precision` is the number of decimal digits used when encoding, OSRM uses 5 for `polyline`
/// and 6 for `polyline6`.
///
/// https://developers.google.com/maps/documentation/utilities/polylinealgorithm
pub fn decode_polyline(encoded: &str, precision: u32) -> Result<Vec<[f64; 2]>, String> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut idx = 0;
    let (mut lat, mut lon) = (0_i64, 0_i64);

    while idx < bytes.len() {
        lat = lat
            .checked_add(decode_value(bytes, &mut idx)?)
            .ok_or("Polyline value overflows")?;
        lon = lon
            .checked_add(decode_value(bytes, &mut idx)?)
            .ok_or("Polyline value overflows")?;
        coordinates.push([lon as f64 / factor, lat as f64 / factor]);
    }

    Ok(coordinates)
}

/// Decode a single latitude or longitude delta starting at `idx`
fn decode_value(bytes: &[u8], idx: &mut usize) -> Result<i64, String> {
    let mut result = 0_i64;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*idx)
            .ok_or("Polyline ended in the middle of a value")? as i64;
        if !(63..127).contains(&byte) {
            return Err(format!("Invalid polyline character: {}", byte as u8 as char));
        }
        if shift > 60 {
            return Err("Polyline value overflows".to_string());
        }
        *idx += 1;
        let chunk = byte - 63;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    if result & 1 == 1 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn trajectory(len: usize) -> Trajectory {
        let lats: Vec<f64> = (0..len).map(|i| 40.0 + i as f64 * 1e-4).collect();
        let lons: Vec<f64> = (0..len).map(|i| -80.0 - i as f64 * 1e-4).collect();
        let stamps: Vec<i64> = (0..len).map(|i| 1_600_000_000 + i as i64).collect();
        Trajectory::from_parts(&lats, &lons, &stamps).expect("valid trajectory")
    }

    #[rstest]
    #[case(1, 100, 1)]
    #[case(3, 100, 1)]
    #[case(100, 100, 1)]
    #[case(101, 100, 2)]
    #[case(250, 100, 3)]
    #[case(7, 1, 7)]
    #[case(10, 3, 4)]
    fn batch_count_is_ceil_of_len_over_size(
        #[case] len: usize,
        #[case] size: usize,
        #[case] expected: usize,
    ) {
        let traj = trajectory(len);
        let batches = traj.batches(size).unwrap();
        assert_eq!(batches.len(), expected);
        for batch in &batches[..batches.len() - 1] {
            assert_eq!(batch.len(), size);
        }
        assert!(batches.last().unwrap().len() <= size);
    }

    #[rstest]
    #[case(10, 3)]
    #[case(250, 100)]
    #[case(5, 5)]
    fn batches_partition_the_trajectory_in_order(#[case] len: usize, #[case] size: usize) {
        let traj = trajectory(len);
        let batches = traj.batches(size).unwrap();
        let joined: Vec<Location> = batches
            .iter()
            .flat_map(|b| b.locations().iter().copied())
            .collect();
        assert_eq!(joined, traj.locations());
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.index(), i);
            assert_eq!(batch.offset(), i * size);
        }
    }

    #[test]
    fn batches_slice_bearings_and_radiuses() {
        let traj = trajectory(5)
            .with_bearings((0..5).map(|i| Bearing::new(i * 10, 45).unwrap()).collect())
            .unwrap()
            .with_radiuses(vec![5.0, 6.0, 7.0, 8.0, 9.0])
            .unwrap();
        let batches = traj.batches(2).unwrap();
        assert_eq!(batches[1].radiuses(), Some(&[7.0, 8.0][..]));
        assert_eq!(batches[2].bearings().unwrap()[0].value(), 40);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(trajectory(3).batches(0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = Trajectory::from_parts(&[1.0, 2.0, 3.0], &[1.0, 2.0], &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = Trajectory::from_parts(&[1.0, 2.0], &[1.0, 2.0], &[1]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = trajectory(3).with_radiuses(vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn empty_and_out_of_range_inputs_are_rejected() {
        assert!(matches!(
            Trajectory::from_parts(&[], &[], &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Trajectory::from_parts(&[91.0], &[0.0], &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Trajectory::from_parts(&[0.0], &[f64::NAN], &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(Bearing::new(361, 10).is_err());
    }

    #[test]
    fn timestamps_are_optional() {
        let traj = Trajectory::from_parts(&[1.0, 2.0], &[3.0, 4.0], &[]).unwrap();
        let batch = traj.batches(10).unwrap()[0];
        assert!(!batch.has_timestamps());
        assert_eq!(traj.locations()[1].timestamp(), None);
    }

    #[test]
    fn decodes_reference_polyline() {
        let coords = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 5).unwrap();
        assert_eq!(
            coords,
            vec![[-120.2, 38.5], [-120.95, 40.7], [-126.453, 43.252]]
        );
    }

    #[test]
    fn truncated_polyline_is_an_error() {
        assert!(decode_polyline("_p~iF~ps|U_", 5).is_err());
        assert!(decode_polyline("_p~iF ", 5).is_err());
    }

    #[test]
    fn overflowing_polyline_is_an_error() {
        // each value decodes to close to i64::MAX so the running sum overflows
        let encoded = format!("{v}?{v}?{v}?", v = "}~~~~~~~~~~~F");
        assert_eq!(
            decode_polyline(&encoded, 5),
            Err("Polyline value overflows".to_string())
        );
    }
}
