//! Dependency propagation along a write chain
//!
//! After a resolution, every chosen package is copied to the publishing
//! repositories that come after its source in the write chain. Repositories
//! at or before the source are never written to.
//!
//! Work happens as the returned [`Propagation`] is consumed.

use std::fmt;
use std::slice;
use std::vec;
use trove_core::PackageDependency;

use crate::error::Result;
use crate::repository::{RepositoryRef, SupportsPublishing};
use crate::resolve::{DependencyResolution, ResolvedDependency};

/// How an event should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// One step of a propagation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationEvent {
    /// The resolution was not successful; nothing was copied
    ResolutionFailed { unresolved: Vec<PackageDependency> },

    /// The package was published to `destination`
    Copied {
        package: String,
        source: String,
        destination: String,
    },

    /// `repository` already holds `existing`, at least as recent as `package`
    UpToDate {
        repository: String,
        package: String,
        existing: String,
    },

    /// `repository` refused the archive because its name already exists
    AlreadyPresent { package: String, repository: String },
}

impl PropagationEvent {
    pub fn severity(&self) -> Severity {
        match self {
            PropagationEvent::ResolutionFailed { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for PropagationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationEvent::ResolutionFailed { unresolved } => {
                let names: Vec<String> = unresolved.iter().map(|d| d.to_string()).collect();
                write!(
                    f,
                    "Dependency resolution failed, no package satisfies: {}",
                    names.join(", ")
                )
            }
            PropagationEvent::Copied {
                package,
                source,
                destination,
            } => write!(f, "Copied '{}' from '{}' to '{}'", package, source, destination),
            PropagationEvent::UpToDate {
                repository,
                package,
                existing,
            } => write!(
                f,
                "'{}' up to date as '{}' <= '{}'",
                repository, package, existing
            ),
            PropagationEvent::AlreadyPresent {
                package,
                repository,
            } => write!(f, "'{}' already present in '{}'", package, repository),
        }
    }
}

/// Copy the packages of `resolution` forward along `write_chain`
pub fn copy_packages_to_repositories<'a>(
    resolution: &'a DependencyResolution,
    write_chain: &'a [RepositoryRef],
) -> Propagation<'a> {
    if resolution.is_success() {
        Propagation {
            chain: write_chain,
            bindings: resolution.resolved.iter(),
            current: None,
            failure: None,
        }
    } else {
        Propagation {
            chain: write_chain,
            bindings: Default::default(),
            current: None,
            failure: Some(PropagationEvent::ResolutionFailed {
                unresolved: resolution.unresolved.clone(),
            }),
        }
    }
}

/// Lazy propagation; see [`copy_packages_to_repositories`]
pub struct Propagation<'a> {
    chain: &'a [RepositoryRef],
    bindings: slice::Iter<'a, ResolvedDependency>,
    current: Option<(&'a ResolvedDependency, vec::IntoIter<RepositoryRef>)>,
    failure: Option<PropagationEvent>,
}

impl Propagation<'_> {
    /// Publishing repositories strictly after the binding's source
    fn targets(&self, binding: &ResolvedDependency) -> Vec<RepositoryRef> {
        let source = binding.source.token();
        let after = match self.chain.iter().position(|r| r.token() == source) {
            Some(idx) => &self.chain[idx + 1..],
            None => self.chain,
        };

        after
            .iter()
            .filter(|r| r.feature::<dyn SupportsPublishing>().is_some())
            .cloned()
            .collect()
    }
}

impl Iterator for Propagation<'_> {
    type Item = Result<PropagationEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(failure) = self.failure.take() {
            return Some(Ok(failure));
        }

        loop {
            if let Some((binding, targets)) = &mut self.current {
                let binding = *binding;
                if let Some(target) = targets.next() {
                    let outcome = copy_to(binding, &target);
                    if outcome.is_err() {
                        // Remaining targets of this binding are abandoned
                        self.current = None;
                    }
                    return Some(outcome);
                }
                self.current = None;
            }

            let binding = self.bindings.next()?;
            let targets = self.targets(binding);
            self.current = Some((binding, targets.into_iter()));
        }
    }
}

fn copy_to(binding: &ResolvedDependency, target: &RepositoryRef) -> Result<PropagationEvent> {
    let package = &binding.package;

    let existing = target
        .packages_by_name()
        .get(package.name())
        .iter()
        .filter(|p| p.version() >= package.version())
        .max_by_key(|p| *p.version())
        .cloned();
    if let Some(existing) = existing {
        return Ok(PropagationEvent::UpToDate {
            repository: target.name().to_string(),
            package: package.full_name(),
            existing: existing.full_name(),
        });
    }

    let file_name = package.identifier().archive_file_name();
    let published = match target.feature::<dyn SupportsPublishing>() {
        Some(publisher) => {
            let mut stream = package.open_stream()?;
            publisher.publish(&file_name, stream.as_mut())?
        }
        None => None,
    };

    match published {
        Some(_) => {
            tracing::info!(
                "Copied {} from {} to {}",
                package.full_name(),
                binding.source.name(),
                target.name()
            );
            Ok(PropagationEvent::Copied {
                package: package.full_name(),
                source: binding.source.name().to_string(),
                destination: target.name().to_string(),
            })
        }
        None => Ok(PropagationEvent::AlreadyPresent {
            package: package.full_name(),
            repository: target.name().to_string(),
        }),
    }
}
