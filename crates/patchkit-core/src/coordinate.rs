use std::fmt;

use crate::error::CoordinateError;
use crate::version::ArtifactVersion;

pub const DEFAULT_ARTIFACT_TYPE: &str = "jar";
const URI_MARKER: &str = "mvn:";

/// Versioned artifact identity: `groupId:artifactId:version[:type[:classifier]]`.
///
/// Group, artifact id, version and type are never empty. A classifier, when
/// present, is never empty either.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
    artifact_type: String,
    classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        artifact_type: impl Into<String>,
        classifier: Option<String>,
    ) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            artifact_type: artifact_type.into(),
            classifier: classifier.filter(|value| !value.is_empty()),
        };
        for (field, value) in [
            ("groupId", &coordinate.group_id),
            ("artifactId", &coordinate.artifact_id),
            ("version", &coordinate.version),
            ("type", &coordinate.artifact_type),
        ] {
            if value.is_empty() {
                return Err(CoordinateError::EmptyField { field });
            }
        }
        Ok(coordinate)
    }

    /// Parses `mvn:groupId/artifactId/version[/type[/classifier]]`.
    ///
    /// Whitespace anywhere in the input is dropped, anything before the `mvn:`
    /// marker is ignored (`wrap:mvn:...`), and the location is cut at the first
    /// `?`, `#` or `$`.
    pub fn parse_uri(input: &str) -> Result<Self, CoordinateError> {
        let compact: String = input.chars().filter(|ch| !ch.is_whitespace()).collect();
        let Some(marker) = compact.find(URI_MARKER) else {
            return Err(CoordinateError::NotArtifactUri { uri: compact });
        };

        let mut location = &compact[marker + URI_MARKER.len()..];
        if let Some(end) = location.find(['?', '#', '$']) {
            location = &location[..end];
        }

        let parts: Vec<&str> = location.split('/').collect();
        if parts.len() < 3 {
            return Err(CoordinateError::Malformed {
                uri: compact.clone(),
                detail: "expected groupId/artifactId/version".to_string(),
            });
        }

        let artifact_type = parts
            .get(3)
            .copied()
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ARTIFACT_TYPE);
        let classifier = parts.get(4).map(|value| value.to_string());

        Self::new(parts[0], parts[1], parts[2], artifact_type, classifier).map_err(|err| {
            CoordinateError::Malformed {
                uri: compact.clone(),
                detail: err.to_string(),
            }
        })
    }

    /// Infers a coordinate from a repository-relative path such as
    /// `org/foo/bar/1.0/bar-1.0-tests.jar`. Anything that does not follow the
    /// repository layout yields `None`.
    pub fn from_repository_path(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim().split('/').collect();
        if segments.len() < 4 {
            return None;
        }

        let count = segments.len();
        let file_name = segments[count - 1];
        let version = segments[count - 2];
        let artifact_id = segments[count - 3];
        let group_segments = &segments[..count - 3];
        if group_segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        let remainder = file_name.strip_prefix(&format!("{artifact_id}-{version}"))?;
        let extension_at = remainder.rfind('.')?;
        let artifact_type = &remainder[extension_at + 1..];
        let classifier = match remainder.strip_prefix('-') {
            Some(_) if extension_at <= 1 => return None,
            Some(_) => Some(remainder[1..extension_at].to_string()),
            None if extension_at == 0 => None,
            None => return None,
        };

        Self::new(
            group_segments.join("."),
            artifact_id,
            version,
            artifact_type,
            classifier,
        )
        .ok()
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn parsed_version(&self) -> ArtifactVersion {
        ArtifactVersion::parse_lenient(&self.version)
    }

    /// Identity match ignoring the version.
    pub fn same_artifact(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.artifact_type == other.artifact_type
            && self.classifier == other.classifier
    }

    /// `group/as/dirs/artifactId/version/artifactId[-classifier]-version.type`.
    ///
    /// The classifier sits before the version in the file name, so
    /// [`Self::from_repository_path`] only recovers unclassified coordinates
    /// from a formatted path.
    pub fn repository_path(&self) -> String {
        let classifier = self
            .classifier
            .as_deref()
            .map(|value| format!("-{value}"))
            .unwrap_or_default();
        format!(
            "{}/{}/{}/{}{}-{}.{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.artifact_id,
            classifier,
            self.version,
            self.artifact_type
        )
    }

    pub fn to_uri(&self) -> String {
        let mut uri = format!(
            "{URI_MARKER}{}/{}/{}",
            self.group_id, self.artifact_id, self.version
        );
        if self.has_non_default_shape() {
            uri.push('/');
            uri.push_str(&self.artifact_type);
            if let Some(classifier) = &self.classifier {
                uri.push('/');
                uri.push_str(classifier);
            }
        }
        uri
    }

    fn has_non_default_shape(&self) -> bool {
        self.artifact_type != DEFAULT_ARTIFACT_TYPE || self.classifier.is_some()
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if self.has_non_default_shape() {
            write!(f, ":{}", self.artifact_type)?;
            if let Some(classifier) = &self.classifier {
                write!(f, ":{classifier}")?;
            }
        }
        Ok(())
    }
}
