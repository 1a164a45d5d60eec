//! Credentials and the credential-injecting repository decorator
//!
//! [`AuthenticatedRepository`] wraps a repository that supports
//! [`SupportsAuthentication`] and sets its credentials for the duration of
//! each call that reaches the backing store, clearing them afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

use crate::error::Result;
use crate::repository::{
    PackageIndex, PackageRef, PackageRepository, RepositoryRef, SupportsAnchoring,
    SupportsAuthentication, SupportsCleaning, SupportsPublishing,
};
use trove_core::PackageDependency;

/// Username/password pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials set on a repository until the scope is dropped
pub struct CredentialScope<'a> {
    target: &'a dyn SupportsAuthentication,
}

impl<'a> CredentialScope<'a> {
    pub fn enter(target: &'a dyn SupportsAuthentication, credentials: &Credentials) -> Self {
        target.set_credentials(Some(credentials.clone()));
        Self { target }
    }
}

impl Drop for CredentialScope<'_> {
    fn drop(&mut self) {
        self.target.set_credentials(None);
    }
}

/// A repository whose backing-store calls carry credentials
///
/// Name, token and type are those of the inner repository.
#[derive(Debug)]
pub struct AuthenticatedRepository {
    inner: RepositoryRef,
    credentials: Credentials,
}

impl AuthenticatedRepository {
    pub fn new(inner: RepositoryRef, credentials: Credentials) -> Self {
        Self { inner, credentials }
    }

    pub fn inner(&self) -> &RepositoryRef {
        &self.inner
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn scope(&self) -> Option<CredentialScope<'_>> {
        self.inner
            .authentication()
            .map(|auth| CredentialScope::enter(auth, &self.credentials))
    }
}

impl PackageRepository for AuthenticatedRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn token(&self) -> &str {
        self.inner.token()
    }

    fn repository_type(&self) -> &str {
        self.inner.repository_type()
    }

    fn packages_by_name(&self) -> PackageIndex {
        self.inner.packages_by_name()
    }

    fn refresh_packages(&self) -> Result<()> {
        let _scope = self.scope();
        self.inner.refresh_packages()
    }

    fn find_all(&self, dependency: &PackageDependency) -> Vec<PackageRef> {
        self.inner.find_all(dependency)
    }

    fn publishing(&self) -> Option<&(dyn SupportsPublishing + 'static)> {
        self.inner
            .publishing()
            .map(|_| self as &(dyn SupportsPublishing + 'static))
    }

    fn cleaning(&self) -> Option<&(dyn SupportsCleaning + 'static)> {
        self.inner.cleaning()
    }

    fn authentication(&self) -> Option<&(dyn SupportsAuthentication + 'static)> {
        self.inner.authentication()
    }

    fn anchoring(&self) -> Option<&(dyn SupportsAnchoring + 'static)> {
        self.inner.anchoring()
    }
}

impl SupportsPublishing for AuthenticatedRepository {
    fn publish(&self, file_name: &str, stream: &mut dyn Read) -> Result<Option<PackageRef>> {
        let Some(publisher) = self.inner.publishing() else {
            return Ok(None);
        };
        let _scope = self.scope();
        publisher.publish(file_name, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRepository, MemoryFeatures};
    use std::rc::Rc;

    fn secured() -> Rc<InMemoryRepository> {
        InMemoryRepository::with_features(
            "secured",
            MemoryFeatures {
                publish: true,
                clean: false,
                authenticate: true,
            },
        )
    }

    #[test]
    fn test_wrapper_keeps_identity() {
        let inner = secured();
        let wrapped = AuthenticatedRepository::new(inner.clone(), Credentials::basic("alice", "pw"));

        assert_eq!(wrapped.name(), "secured");
        assert_eq!(wrapped.token(), inner.token());
        assert_eq!(wrapped.repository_type(), "memory");
    }

    #[test]
    fn test_publish_runs_inside_credential_scope() {
        let inner = secured();
        let wrapped: RepositoryRef = Rc::new(AuthenticatedRepository::new(
            inner.clone(),
            Credentials::basic("alice", "pw"),
        ));

        let publisher = wrapped.feature::<dyn SupportsPublishing>().unwrap();
        let published = publisher
            .publish("moq-4.0.trove", &mut &b"bytes"[..])
            .unwrap()
            .unwrap();

        assert_eq!(published.full_name(), "moq-4.0");
        assert_eq!(inner.credential_log(), vec![Some("alice".to_string())]);
        assert!(inner.current_credentials().is_none());
    }

    #[test]
    fn test_refresh_runs_inside_credential_scope() {
        let inner = secured();
        let wrapped = AuthenticatedRepository::new(inner.clone(), Credentials::basic("bob", "pw"));

        wrapped.refresh_packages().unwrap();

        assert_eq!(inner.credential_log(), vec![Some("bob".to_string())]);
        assert!(inner.current_credentials().is_none());
    }

    #[test]
    fn test_capabilities_follow_inner_repository() {
        let read_only: RepositoryRef = Rc::new(AuthenticatedRepository::new(
            InMemoryRepository::read_only("mirror"),
            Credentials::basic("alice", "pw"),
        ));
        assert!(read_only.feature::<dyn SupportsPublishing>().is_none());
        assert!(read_only.feature::<dyn SupportsCleaning>().is_none());

        let writable: RepositoryRef = Rc::new(AuthenticatedRepository::new(
            secured(),
            Credentials::basic("alice", "pw"),
        ));
        assert!(writable.feature::<dyn SupportsPublishing>().is_some());
        assert!(writable.feature::<dyn SupportsAuthentication>().is_some());
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::basic("alice", "hunter2"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
