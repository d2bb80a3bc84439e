/// Errors raised while parsing artifact coordinates and version ranges.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    /// The input carries no `mvn:` marker; callers usually skip it.
    #[error("not an artifact URI: {uri}")]
    NotArtifactUri { uri: String },

    #[error("malformed artifact URI '{uri}': {detail}")]
    Malformed { uri: String, detail: String },

    #[error("artifact coordinate field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("invalid version range '{spec}': {detail}")]
    InvalidRange { spec: String, detail: String },
}
