//! Typed parameters of the OSRM match service
//!
//! Only the parameters listed here are forwarded to the server, each one is formatted exactly
//! the way the OSRM HTTP API expects it. See http://project-osrm.org/docs for details.
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of the returned route geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometries {
    Polyline,
    Polyline6,
    GeoJson,
}

impl fmt::Display for Geometries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometries::Polyline => write!(f, "polyline"),
            Geometries::Polyline6 => write!(f, "polyline6"),
            Geometries::GeoJson => write!(f, "geojson"),
        }
    }
}

/// Amount of overview geometry added to each matching
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overview {
    Simplified,
    Full,
    False,
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overview::Simplified => write!(f, "simplified"),
            Overview::Full => write!(f, "full"),
            Overview::False => write!(f, "false"),
        }
    }
}

/// Whether the server may split the trace on large timestamp gaps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gaps {
    Split,
    Ignore,
}

impl fmt::Display for Gaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gaps::Split => write!(f, "split"),
            Gaps::Ignore => write!(f, "ignore"),
        }
    }
}

/// A single kind of per segment metadata the server can attach to a leg
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    Nodes,
    Distance,
    Duration,
    Datasources,
    Weight,
    Speed,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Annotation::Nodes => "nodes",
            Annotation::Distance => "distance",
            Annotation::Duration => "duration",
            Annotation::Datasources => "datasources",
            Annotation::Weight => "weight",
            Annotation::Speed => "speed",
        };
        write!(f, "{}", name)
    }
}

/// Which annotations to request, either all, none or an explicit list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Annotations {
    All(bool),
    Only(Vec<Annotation>),
}

impl fmt::Display for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotations::All(flag) => write!(f, "{}", flag),
            // the server rejects an empty list
            Annotations::Only(kinds) if kinds.is_empty() => write!(f, "false"),
            Annotations::Only(kinds) => {
                let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
                write!(f, "{}", kinds.join(","))
            }
        }
    }
}

/// Parameters of a single match request that apply to the whole trace
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    /// API version segment of the request path
    pub version: String,
    /// Profile segment of the request path, the behaviour depends on how the server was set up
    pub profile: String,
    pub steps: bool,
    pub geometries: Geometries,
    pub annotations: Annotations,
    pub overview: Overview,
    pub gaps: Gaps,
    pub tidy: bool,
}

impl MatchOptions {
    /// Options that return everything needed to fill in the route table: steps with GeoJSON
    /// geometry, full overview and every annotation
    pub fn detailed() -> Self {
        MatchOptions {
            steps: true,
            geometries: Geometries::GeoJson,
            annotations: Annotations::All(true),
            overview: Overview::Full,
            ..Default::default()
        }
    }

    /// Check the values that end up in the request path.
    ///
    /// `version` and `profile` must be non-empty and only hold ASCII letters, digits, `_` or `-`.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in &[("version", &self.version), ("profile", &self.profile)] {
            let valid = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(Error::InvalidInput(format!(
                    "{} must only contain letters, digits, '_' or '-': {:?}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Query string pairs for the trace wide options, in a stable order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("geometries", self.geometries.to_string()),
            ("steps", self.steps.to_string()),
            ("overview", self.overview.to_string()),
            ("annotations", self.annotations.to_string()),
            ("gaps", self.gaps.to_string()),
            ("tidy", self.tidy.to_string()),
        ]
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            version: "v1".to_string(),
            profile: "driving".to_string(),
            steps: false,
            geometries: Geometries::Polyline,
            annotations: Annotations::All(false),
            overview: Overview::Simplified,
            gaps: Gaps::Split,
            tidy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_pairs() {
        let pairs = MatchOptions::default().query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("geometries", "polyline".to_string()),
                ("steps", "false".to_string()),
                ("overview", "simplified".to_string()),
                ("annotations", "false".to_string()),
                ("gaps", "split".to_string()),
                ("tidy", "false".to_string()),
            ]
        );
    }

    #[test]
    fn deserialize_partial_options_from_yaml() {
        let yaml = "
steps: true
geometries: geojson
annotations: [nodes, distance]
overview: full
";
        let opts: MatchOptions = serde_yaml::from_str(yaml).unwrap();
        assert!(opts.steps);
        assert_eq!(opts.geometries, Geometries::GeoJson);
        assert_eq!(opts.annotations.to_string(), "nodes,distance");
        assert_eq!(opts.overview, Overview::Full);
        assert_eq!(opts.profile, "driving");
    }

    #[test]
    fn boolean_annotations_deserialize() {
        let opts: MatchOptions = serde_yaml::from_str("annotations: true").unwrap();
        assert_eq!(opts.annotations, Annotations::All(true));
    }

    #[test]
    fn empty_annotation_list_requests_none() {
        let opts = MatchOptions {
            annotations: Annotations::Only(vec![]),
            ..Default::default()
        };
        assert!(opts
            .query_pairs()
            .contains(&("annotations", "false".to_string())));
    }

    #[test]
    fn path_segments_are_validated() {
        assert!(MatchOptions::default().validate().is_ok());
        let opts = MatchOptions {
            profile: "my-car_2".to_string(),
            ..Default::default()
        };
        assert!(opts.validate().is_ok());
        let invalid = [
            ("v1", "driving/../x"),
            ("v1", "foot?x=1"),
            ("v 1", "car"),
            ("", "car"),
        ];
        for (version, profile) in &invalid {
            let opts = MatchOptions {
                version: version.to_string(),
                profile: profile.to_string(),
                ..Default::default()
            };
            assert!(matches!(opts.validate(), Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn unknown_option_is_rejected() {
        let res: Result<MatchOptions, _> = serde_yaml::from_str("continue_straight: true");
        assert!(res.is_err());
    }
}
