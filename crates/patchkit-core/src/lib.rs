mod coordinate;
mod descriptor;
mod error;
mod version;

pub use coordinate::{ArtifactCoordinate, DEFAULT_ARTIFACT_TYPE};
pub use descriptor::{PatchDescriptor, DESCRIPTOR_EXTENSION};
pub use error::CoordinateError;
pub use version::{ArtifactVersion, VersionRange};
