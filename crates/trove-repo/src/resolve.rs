//! Per-dependency package selection across a read chain
//!
//! Each dependency resolves independently: the highest satisfying version
//! wins, and on equal versions the repository earliest in the chain wins.
//! There is no transitive solving.

use trove_core::PackageDependency;

use crate::repository::{PackageRef, RepositoryRef};

/// A dependency bound to the package chosen for it
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub dependency: PackageDependency,
    pub package: PackageRef,
    /// Repository of the read chain the package was found in
    pub source: RepositoryRef,
}

/// Outcome of resolving a set of dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyResolution {
    pub resolved: Vec<ResolvedDependency>,
    pub unresolved: Vec<PackageDependency>,
}

impl DependencyResolution {
    pub fn is_success(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Chosen packages, in dependency order
    pub fn packages(&self) -> Vec<PackageRef> {
        self.resolved.iter().map(|r| r.package.clone()).collect()
    }
}

/// Best candidate for `dependency` and the repository holding it
pub fn select_best(
    dependency: &PackageDependency,
    read_chain: &[RepositoryRef],
) -> Option<(PackageRef, RepositoryRef)> {
    let mut best: Option<(PackageRef, RepositoryRef)> = None;

    for repository in read_chain {
        for candidate in repository.find_all(dependency) {
            let better = match &best {
                Some((current, _)) => candidate.version() > current.version(),
                None => true,
            };
            if better {
                best = Some((candidate, repository.clone()));
            }
        }
    }

    if let Some((package, repository)) = &best {
        tracing::debug!(
            "{} resolved to {} from {}",
            dependency,
            package.full_name(),
            repository.name()
        );
    }
    best
}

/// Resolve every dependency against `read_chain`
pub fn resolve(
    dependencies: &[PackageDependency],
    read_chain: &[RepositoryRef],
) -> DependencyResolution {
    let mut resolution = DependencyResolution::default();

    for dependency in dependencies {
        match select_best(dependency, read_chain) {
            Some((package, source)) => resolution.resolved.push(ResolvedDependency {
                dependency: dependency.clone(),
                package,
                source,
            }),
            None => {
                tracing::debug!("No package satisfies {}", dependency);
                resolution.unresolved.push(dependency.clone());
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    fn dependency(text: &str) -> PackageDependency {
        text.parse().unwrap()
    }

    #[test]
    fn test_highest_version_wins() {
        let near = InMemoryRepository::new("near");
        near.add_package("nunit", "2.5", b"").unwrap();
        let far = InMemoryRepository::new("far");
        far.add_package("nunit", "2.6", b"").unwrap();
        far.add_package("nunit", "3.0", b"").unwrap();
        let chain: Vec<RepositoryRef> = vec![near, far];

        let (package, source) = select_best(&dependency("nunit < 3.0"), &chain).unwrap();
        assert_eq!(package.full_name(), "nunit-2.6");
        assert_eq!(source.name(), "far");
    }

    #[test]
    fn test_ties_prefer_earlier_repository() {
        let near = InMemoryRepository::new("near");
        near.add_package("nunit", "2.5", b"").unwrap();
        let far = InMemoryRepository::new("far");
        far.add_package("nunit", "2.5", b"").unwrap();
        let chain: Vec<RepositoryRef> = vec![near, far];

        let (_, source) = select_best(&dependency("nunit"), &chain).unwrap();
        assert_eq!(source.name(), "near");
    }

    #[test]
    fn test_resolve_reports_unresolved() {
        let repo = InMemoryRepository::new("local");
        repo.add_package("nunit", "2.5", b"").unwrap();
        let chain: Vec<RepositoryRef> = vec![repo];

        let resolution = resolve(&[dependency("nunit"), dependency("moq >= 4.0")], &chain);

        assert!(!resolution.is_success());
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.unresolved[0].name(), "moq");
        assert_eq!(resolution.packages()[0].full_name(), "nunit-2.5");
    }

    #[test]
    fn test_empty_chain_resolves_nothing() {
        let resolution = resolve(&[dependency("nunit")], &[]);
        assert!(!resolution.is_success());
        assert!(resolution.resolved.is_empty());

        assert!(resolve(&[], &[]).is_success());
    }
}
