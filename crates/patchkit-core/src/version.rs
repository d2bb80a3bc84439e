use std::fmt;

use crate::error::CoordinateError;

/// Lenient `major.minor.micro[.qualifier]` version.
///
/// Missing numeric parts default to zero and everything after the numeric
/// prefix becomes the qualifier, so `1.2-SNAPSHOT` reads as `1.2.0.SNAPSHOT`.
/// Ordering is numeric on the first three parts, then lexical on the
/// qualifier, with an empty qualifier sorting lowest.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactVersion {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl ArtifactVersion {
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn parse_lenient(input: &str) -> Self {
        let mut numbers = [0u64; 3];
        let mut rest = input.trim();

        for (index, slot) in numbers.iter_mut().enumerate() {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                break;
            }
            let Ok(value) = rest[..digits].parse::<u64>() else {
                break;
            };
            *slot = value;
            rest = &rest[digits..];

            if index < 2 {
                match rest.strip_prefix('.') {
                    Some(next) if next.starts_with(|ch: char| ch.is_ascii_digit()) => rest = next,
                    _ => break,
                }
            }
        }

        Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier: rest.trim_start_matches(['.', '-', '_']).to_string(),
        }
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// Interval of artifact versions, e.g. `[1.0,2.0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    floor: ArtifactVersion,
    ceiling: Option<ArtifactVersion>,
    floor_inclusive: bool,
    ceiling_inclusive: bool,
}

impl VersionRange {
    pub fn new(
        floor: ArtifactVersion,
        floor_inclusive: bool,
        ceiling: Option<ArtifactVersion>,
        ceiling_inclusive: bool,
    ) -> Self {
        Self {
            floor,
            ceiling,
            floor_inclusive,
            ceiling_inclusive,
        }
    }

    /// `[major.minor.0, major.(minor+1).0)`, used when a patch names no range.
    pub fn default_for(version: &ArtifactVersion) -> Self {
        Self::new(
            ArtifactVersion::new(version.major, version.minor, 0),
            true,
            Some(ArtifactVersion::new(
                version.major,
                version.minor.saturating_add(1),
                0,
            )),
            false,
        )
    }

    /// Parses interval notation (`[a,b)`, `(a,b]`, ...) or a bare version,
    /// which means "this version or newer".
    pub fn parse(spec: &str) -> Result<Self, CoordinateError> {
        let trimmed = spec.trim();
        let invalid = |detail: &str| CoordinateError::InvalidRange {
            spec: spec.to_string(),
            detail: detail.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("range must not be empty"));
        }

        let floor_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => {
                if trimmed.contains([',', '[', ']', '(', ')']) {
                    return Err(invalid("interval must start with '[' or '('"));
                }
                return Ok(Self::new(
                    ArtifactVersion::parse_lenient(trimmed),
                    true,
                    None,
                    false,
                ));
            }
        };
        let ceiling_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("interval must end with ']' or ')'")),
        };
        if trimmed.len() < 2 {
            return Err(invalid("interval is missing its closing bracket"));
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        let (floor, ceiling) = inner
            .split_once(',')
            .ok_or_else(|| invalid("interval must contain two versions separated by ','"))?;
        let (floor, ceiling) = (floor.trim(), ceiling.trim());
        if floor.is_empty() || ceiling.is_empty() || ceiling.contains(',') {
            return Err(invalid("interval must contain exactly two versions"));
        }

        Ok(Self::new(
            ArtifactVersion::parse_lenient(floor),
            floor_inclusive,
            Some(ArtifactVersion::parse_lenient(ceiling)),
            ceiling_inclusive,
        ))
    }

    pub fn floor(&self) -> &ArtifactVersion {
        &self.floor
    }

    pub fn ceiling(&self) -> Option<&ArtifactVersion> {
        self.ceiling.as_ref()
    }

    pub fn is_floor_inclusive(&self) -> bool {
        self.floor_inclusive
    }

    pub fn is_ceiling_inclusive(&self) -> bool {
        self.ceiling_inclusive
    }

    pub fn contains(&self, version: &ArtifactVersion) -> bool {
        let above_floor = if self.floor_inclusive {
            version >= &self.floor
        } else {
            version > &self.floor
        };
        if !above_floor {
            return false;
        }

        match &self.ceiling {
            None => true,
            Some(ceiling) if self.ceiling_inclusive => version <= ceiling,
            Some(ceiling) => version < ceiling,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(ceiling) = &self.ceiling else {
            return write!(f, "{}", self.floor);
        };
        write!(
            f,
            "{}{},{}{}",
            if self.floor_inclusive { '[' } else { '(' },
            self.floor,
            ceiling,
            if self.ceiling_inclusive { ']' } else { ')' }
        )
    }
}
