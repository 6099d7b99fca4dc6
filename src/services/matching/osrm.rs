//! Match GPS traces using the match service of an OSRM instance
use super::response::{ErrorResponse, MatchResponse};
use super::MapMatchingService;
use crate::{
    config::{FromServiceConfig, ServiceConfig},
    gps::QueryBatch,
    options::MatchOptions,
    set_string_param_from_config, Error,
};
use log::{trace, warn};
use reqwest::{blocking::Client, StatusCode, Url};
use std::time::Duration;

/// Default user agent for match requests
pub const DEFAULT_USER_AGENT: &str = concat!("osrm-match/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
/// Defines the connection parameters used to reach an OSRM server
pub struct OsrmServer {
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl OsrmServer {
    /// Create a client for the server at `base_url`, e.g. `http://127.0.0.1:5000`
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let server = OsrmServer {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        };
        server.validate()?;
        Ok(server)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn validate(&self) -> Result<(), Error> {
        Url::parse(&self.base_url)
            .map(|_| ())
            .map_err(|e| Error::InvalidInput(format!("invalid server url '{}': {}", self.base_url, e)))
    }

    fn client(&self) -> Result<Client, Error> {
        let builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout());
        Ok(builder.build()?)
    }

    /// Build the full match request url for a batch.
    ///
    /// Coordinates go into the path as `lon,lat` pairs separated by semicolons, per point
    /// parameters are semicolon separated lists in the query string.
    pub fn request_url(&self, batch: &QueryBatch<'_>, options: &MatchOptions) -> String {
        let coordinates = batch
            .locations()
            .iter()
            .map(|l| format!("{},{}", l.longitude(), l.latitude()))
            .collect::<Vec<String>>()
            .join(";");
        let mut params: Vec<(&str, String)> = options.query_pairs();
        if batch.has_timestamps() {
            let stamps = batch
                .locations()
                .iter()
                .filter_map(|l| l.timestamp())
                .map(|t| t.to_string())
                .collect::<Vec<String>>();
            params.push(("timestamps", stamps.join(";")));
        }
        if let Some(bearings) = batch.bearings() {
            let bearings = bearings
                .iter()
                .map(|b| format!("{},{}", b.value(), b.range()))
                .collect::<Vec<String>>();
            params.push(("bearings", bearings.join(";")));
        }
        if let Some(radiuses) = batch.radiuses() {
            let radiuses = radiuses
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<String>>();
            params.push(("radiuses", radiuses.join(";")));
        }
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<String>>()
            .join("&");

        format!(
            "{}/match/{}/{}/{}?{}",
            self.base_url, options.version, options.profile, coordinates, query
        )
    }
}

impl Default for OsrmServer {
    fn default() -> Self {
        OsrmServer {
            base_url: "http://localhost:5000".to_string(),
            timeout: Some(Duration::from_secs(30)),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FromServiceConfig for OsrmServer {
    fn from_config(config: &ServiceConfig) -> Result<Self, Error> {
        let mut base = Self::default();
        for key in config.parameters() {
            match key.as_ref() {
                "base_url" => set_string_param_from_config!(base, base_url, config),
                "timeout_secs" => {
                    // zero disables the timeout
                    if let Some(secs) = config.get_parameter_as_u64(key) {
                        base.timeout = Some(Duration::from_secs(secs?)).filter(|t| !t.is_zero());
                    }
                }
                "user_agent" => set_string_param_from_config!(base, user_agent, config),
                _ => warn!(
                    "unknown configuration parameter for OsrmServer: {}={:?}",
                    key,
                    config.get_parameter(key)
                ),
            }
        }
        base.base_url = base.base_url.trim_end_matches('/').to_string();
        base.validate()?;

        Ok(base)
    }
}

impl MapMatchingService for OsrmServer {
    fn match_batch(
        &self,
        batch: &QueryBatch<'_>,
        options: &MatchOptions,
    ) -> Result<MatchResponse, Error> {
        let request_url = self.request_url(batch, options);
        trace!("GET {}", request_url);

        let resp = self.client()?.get(&request_url).send()?;
        let status = resp.status();
        let body = resp.text()?;
        parse_match_response(batch.index(), status, &body)
    }

    fn describe_request(&self, batch: &QueryBatch<'_>, options: &MatchOptions) -> String {
        self.request_url(batch, options)
    }
}

/// Check the status and body of a match reply and deserialize it.
///
/// Failure statuses, bodies that are not a match response and responses whose `code` is not
/// `Ok` all become `Error::ServerResponse` tagged with `batch`.
pub fn parse_match_response(
    batch: usize,
    status: StatusCode,
    body: &str,
) -> Result<MatchResponse, Error> {
    if !status.is_success() {
        // OSRM explains most failures in the body, fall back to the raw text otherwise
        return Err(match serde_json::from_str::<ErrorResponse>(body) {
            Ok(json) => Error::server_response(
                batch,
                Some(status),
                Some(json.code),
                &json.message.unwrap_or_default(),
            ),
            Err(_) => Error::server_response(batch, Some(status), None, body),
        });
    }

    let response: MatchResponse = serde_json::from_str(body).map_err(|e| {
        Error::server_response(
            batch,
            Some(status),
            None,
            &format!("malformed response body ({}): {}", e, body),
        )
    })?;
    if !response.is_ok() {
        return Err(Error::server_response(
            batch,
            Some(status),
            Some(response.code),
            &response.message.unwrap_or_default(),
        ));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::{Bearing, Trajectory};
    use crate::options::{Geometries, Overview};

    fn trajectory() -> Trajectory {
        Trajectory::from_parts(
            &[40.5, 40.25, 40.125],
            &[-80.5, -80.25, -80.125],
            &[1000, 1010, 1020],
        )
        .unwrap()
    }

    #[test]
    fn request_url_encodes_coordinates_and_options() {
        let server = OsrmServer::new("http://127.0.0.1:5000/").unwrap();
        let traj = trajectory();
        let batch = traj.batches(100).unwrap()[0];

        let url = server.request_url(&batch, &MatchOptions::default());

        assert_eq!(
            url,
            "http://127.0.0.1:5000/match/v1/driving/-80.5,40.5;-80.25,40.25;-80.125,40.125\
             ?geometries=polyline&steps=false&overview=simplified&annotations=false\
             &gaps=split&tidy=false&timestamps=1000;1010;1020"
        );
    }

    #[test]
    fn request_url_includes_per_point_parameters_of_the_batch() {
        let server = OsrmServer::new("http://osrm.example.com").unwrap();
        let traj = trajectory()
            .with_bearings(vec![
                Bearing::new(0, 20).unwrap(),
                Bearing::new(90, 20).unwrap(),
                Bearing::new(180, 45).unwrap(),
            ])
            .unwrap()
            .with_radiuses(vec![5.0, 10.5, 20.0])
            .unwrap();
        let batch = traj.batches(2).unwrap()[1];
        let options = MatchOptions {
            profile: "foot".to_string(),
            geometries: Geometries::GeoJson,
            overview: Overview::Full,
            ..Default::default()
        };

        let url = server.request_url(&batch, &options);

        assert!(url.starts_with("http://osrm.example.com/match/v1/foot/-80.125,40.125?"));
        assert!(url.contains("geometries=geojson"));
        assert!(url.contains("overview=full"));
        assert!(url.contains("&timestamps=1020"));
        assert!(url.ends_with("&bearings=180,45&radiuses=20"));
    }

    #[test]
    fn timestamps_are_omitted_when_missing() {
        let server = OsrmServer::default();
        let traj = Trajectory::from_parts(&[1.0, 2.0], &[3.0, 4.0], &[]).unwrap();
        let batch = traj.batches(10).unwrap()[0];
        assert!(!server
            .request_url(&batch, &MatchOptions::default())
            .contains("timestamps"));
    }

    #[test]
    fn timeout_can_be_changed_or_disabled() {
        let server = OsrmServer::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(server.timeout(), Some(Duration::from_secs(30)));
        let server = server.with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(server.timeout(), Some(Duration::from_secs(5)));
        let server = server.with_timeout(Some(Duration::from_millis(500)));
        assert_eq!(server.timeout(), Some(Duration::from_millis(500)));
        assert_eq!(server.with_timeout(None).timeout(), None);
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        assert!(matches!(
            OsrmServer::new("not a url"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn from_config_reads_known_parameters() {
        let config: ServiceConfig = serde_yaml::from_str(
            "
handler: osrm
configuration:
  base_url: http://10.0.0.1:5000/
  timeout_secs: 0
  user_agent: test-agent
  unused: 1
",
        )
        .unwrap();
        let server = OsrmServer::from_config(&config).unwrap();
        assert_eq!(server.base_url(), "http://10.0.0.1:5000");
        assert_eq!(server.timeout(), None);
        assert_eq!(server.user_agent, "test-agent");
    }

    #[test]
    fn from_config_rejects_wrong_types() {
        let config: ServiceConfig =
            serde_yaml::from_str("handler: osrm\nconfiguration:\n  timeout_secs: soon\n").unwrap();
        assert!(matches!(
            OsrmServer::from_config(&config),
            Err(Error::InvalidConfigurationValue(_))
        ));
    }

    #[test]
    fn success_response_is_parsed() {
        let body = r#"{"code": "Ok", "tracepoints": [null], "matchings": []}"#;
        let response = parse_match_response(0, StatusCode::OK, body).unwrap();
        assert_eq!(response.tracepoints.len(), 1);
    }

    #[test]
    fn error_status_carries_code_and_message() {
        let body = r#"{"code": "TooBig", "message": "Too many trace coordinates"}"#;
        let err = parse_match_response(4, StatusCode::BAD_REQUEST, body).unwrap_err();
        match err {
            Error::ServerResponse {
                batch,
                status,
                code,
                message,
            } => {
                assert_eq!(batch, 4);
                assert_eq!(status, Some(StatusCode::BAD_REQUEST));
                assert_eq!(code.as_deref(), Some("TooBig"));
                assert_eq!(message, "Too many trace coordinates");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn error_status_with_html_body_keeps_a_snippet() {
        let err = parse_match_response(0, StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>")
            .unwrap_err();
        assert!(err.to_string().contains("<html>Bad Gateway</html>"));
    }

    #[test]
    fn malformed_success_body_is_a_server_error() {
        let err = parse_match_response(2, StatusCode::OK, "{\"tracepoints\": 5}").unwrap_err();
        assert_eq!(err.batch(), Some(2));
    }

    #[test]
    fn non_ok_code_with_success_status_is_a_server_error() {
        let err = parse_match_response(0, StatusCode::OK, r#"{"code": "NoSegment"}"#).unwrap_err();
        assert!(matches!(err, Error::ServerResponse { code: Some(ref c), .. } if c == "NoSegment"));
    }
}
