//! Version constraint model
//!
//! Versions are four-component numeric tuples (`major.minor[.build[.revision]]`).
//! Build and revision may be unset; an unset component orders below any
//! specified value, so `1.0 < 1.0.0 < 1.0.1`.
//!
//! A [`VersionVertex`] is one atomic predicate ("`>= 2.0`"), and a
//! [`PackageDependency`] is a package name with a conjunctive set of vertices.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A package version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

impl Version {
    /// Create a two-component version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Set the build component
    pub const fn with_build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    /// Set the revision component, defaulting an unset build to 0
    pub const fn with_revision(mut self, revision: u32) -> Self {
        if self.build.is_none() {
            self.build = Some(0);
        }
        self.revision = Some(revision);
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Number of specified components (2 to 4)
    pub fn precision(&self) -> usize {
        match (self.build, self.revision) {
            (None, _) => 2,
            (Some(_), None) => 3,
            (Some(_), Some(_)) => 4,
        }
    }

    /// Drop every component below `precision`
    pub fn truncate(&self, precision: usize) -> Self {
        Self {
            major: self.major,
            minor: self.minor,
            build: if precision >= 3 { self.build } else { None },
            revision: if precision >= 4 { self.revision } else { None },
        }
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidVersion {
            input: s.to_string(),
        };

        let components = s
            .trim()
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u32>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>>>()?;

        match components.as_slice() {
            [major, minor] => Ok(Version::new(*major, *minor)),
            [major, minor, build] => Ok(Version::new(*major, *minor).with_build(*build)),
            [major, minor, build, revision] => Ok(Version::new(*major, *minor)
                .with_build(*build)
                .with_revision(*revision)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Version {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        Ok(())
    }
}

/// How a constraint compares candidates against a partially specified bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrecisionPolicy {
    /// Truncate the candidate to the bound's precision before comparing.
    /// `= 1.2` matches `1.2.7`, `< 2.0` rejects `2.0.1`.
    #[default]
    Specified,

    /// Compare all four components, unset ordering below zero
    Full,
}

impl PrecisionPolicy {
    fn compare(self, candidate: &Version, bound: &Version) -> Ordering {
        match self {
            PrecisionPolicy::Specified => candidate.truncate(bound.precision()).cmp(bound),
            PrecisionPolicy::Full => candidate.cmp(bound),
        }
    }
}

/// A single version predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionVertex {
    Any,
    Exact(Version),
    GreaterThan(Version),
    GreaterThanOrEqual(Version),
    LessThan(Version),
    LessThanOrEqual(Version),
}

impl VersionVertex {
    /// Check a version using the default precision policy
    pub fn matches(&self, version: &Version) -> bool {
        self.matches_with(version, PrecisionPolicy::default())
    }

    pub fn matches_with(&self, version: &Version, policy: PrecisionPolicy) -> bool {
        match self {
            VersionVertex::Any => true,
            VersionVertex::Exact(bound) => policy.compare(version, bound) == Ordering::Equal,
            VersionVertex::GreaterThan(bound) => {
                policy.compare(version, bound) == Ordering::Greater
            }
            VersionVertex::GreaterThanOrEqual(bound) => {
                policy.compare(version, bound) != Ordering::Less
            }
            VersionVertex::LessThan(bound) => policy.compare(version, bound) == Ordering::Less,
            VersionVertex::LessThanOrEqual(bound) => {
                policy.compare(version, bound) != Ordering::Greater
            }
        }
    }

    /// The bound of this vertex, `None` for `Any`
    pub fn version(&self) -> Option<&Version> {
        match self {
            VersionVertex::Any => None,
            VersionVertex::Exact(v)
            | VersionVertex::GreaterThan(v)
            | VersionVertex::GreaterThanOrEqual(v)
            | VersionVertex::LessThan(v)
            | VersionVertex::LessThanOrEqual(v) => Some(v),
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            VersionVertex::Any => "any",
            VersionVertex::Exact(_) => "=",
            VersionVertex::GreaterThan(_) => ">",
            VersionVertex::GreaterThanOrEqual(_) => ">=",
            VersionVertex::LessThan(_) => "<",
            VersionVertex::LessThanOrEqual(_) => "<=",
        }
    }
}

impl fmt::Display for VersionVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version() {
            Some(version) => write!(f, "{} {}", self.operator(), version),
            None => f.write_str(self.operator()),
        }
    }
}

impl FromStr for VersionVertex {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(VersionVertex::Any);
        }

        // Two-character operators first so ">=" is not read as ">"
        let (constructor, rest): (fn(Version) -> VersionVertex, &str) =
            if let Some(rest) = s.strip_prefix(">=") {
                (VersionVertex::GreaterThanOrEqual, rest)
            } else if let Some(rest) = s.strip_prefix("<=") {
                (VersionVertex::LessThanOrEqual, rest)
            } else if let Some(rest) = s.strip_prefix('=') {
                (VersionVertex::Exact, rest)
            } else if let Some(rest) = s.strip_prefix('>') {
                (VersionVertex::GreaterThan, rest)
            } else if let Some(rest) = s.strip_prefix('<') {
                (VersionVertex::LessThan, rest)
            } else {
                return Err(CoreError::InvalidDependency {
                    input: s.to_string(),
                    reason: "expected one of =, >, >=, <, <= or 'any'".to_string(),
                });
            };

        Ok(constructor(rest.trim().parse()?))
    }
}

/// A named dependency with conjunctive version constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    name: String,
    vertices: Vec<VersionVertex>,
}

impl PackageDependency {
    /// A dependency on any version of `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
        }
    }

    /// Add a constraint
    pub fn with_vertex(mut self, vertex: VersionVertex) -> Self {
        self.vertices.push(vertex);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[VersionVertex] {
        &self.vertices
    }

    /// Check a version against every constraint
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.is_satisfied_by_with(version, PrecisionPolicy::default())
    }

    pub fn is_satisfied_by_with(&self, version: &Version, policy: PrecisionPolicy) -> bool {
        self.vertices
            .iter()
            .all(|vertex| vertex.matches_with(version, policy))
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, vertex) in self.vertices.iter().enumerate() {
            let separator = if i == 0 { " " } else { " and " };
            write!(f, "{}{}", separator, vertex)?;
        }
        Ok(())
    }
}

impl FromStr for PackageDependency {
    type Err = CoreError;

    /// Parse `name [op version [and op version]...]`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidDependency {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens = s.split_whitespace();
        let name = tokens.next().ok_or_else(|| invalid("missing package name"))?;
        if name.starts_with(['=', '<', '>']) {
            return Err(invalid("missing package name"));
        }

        let mut dependency = PackageDependency::new(name);
        let mut current = String::new();
        for token in tokens {
            if token.eq_ignore_ascii_case("and") {
                if current.is_empty() {
                    return Err(invalid("empty constraint before 'and'"));
                }
                dependency.vertices.push(current.parse()?);
                current.clear();
            } else {
                current.push_str(token);
            }
        }

        if !current.is_empty() {
            dependency.vertices.push(current.parse()?);
        } else if !dependency.vertices.is_empty() {
            return Err(invalid("trailing 'and'"));
        }

        Ok(dependency)
    }
}
