//! End-to-end tests over folder repositories

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use trove_core::{PackageContent, PackageDependency};
use trove_core::archive::archive_bytes;
use trove_repo::{
    AnchorOutcome, FileConfigurationStore, FolderRepository, FolderRepositoryFactory,
    PackageRepository, PropagationEvent, RemoteEndpoint, RemoteManager, RemoteRepositories,
    RemoteRepository, RepositoryFactory, RepositoryRef, SupportsAnchoring, SupportsCleaning,
    copy_packages_to_repositories, resolve,
};

fn write_package(dir: &Path, full_name: &str) {
    let bytes = archive_bytes(vec![PackageContent::new(
        "bin/tool.txt",
        format!("content of {}", full_name),
    )])
    .unwrap();
    fs::write(dir.join(format!("{}.trove", full_name)), bytes).unwrap();
}

struct Workspace {
    _temp: TempDir,
    config: std::path::PathBuf,
    remote: std::path::PathBuf,
    system: std::path::PathBuf,
    project: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    let workspace = Workspace {
        config: root.join("config"),
        remote: root.join("remote"),
        system: root.join("system"),
        project: root.join("project"),
        _temp: temp,
    };
    fs::create_dir_all(&workspace.remote).unwrap();
    workspace
}

fn remote_manager(workspace: &Workspace) -> RemoteManager<FileConfigurationStore> {
    let factories: Vec<Box<dyn RepositoryFactory>> = vec![Box::new(FolderRepositoryFactory::new())];
    RemoteManager::new(FileConfigurationStore::new(&workspace.config), factories)
}

#[test]
fn test_sync_from_remote_into_system_and_project() {
    let workspace = workspace();
    write_package(&workspace.remote, "nunit-2.5");
    write_package(&workspace.remote, "nunit-2.6");
    write_package(&workspace.remote, "moq-4.0");

    let manager = remote_manager(&workspace);
    let remote = manager
        .resolve_user_input(&workspace.remote.display().to_string())
        .unwrap()
        .unwrap();
    let mut remotes = RemoteRepositories::default();
    remotes
        .add(RemoteRepository::new("central", 1, RemoteEndpoint::new(remote.token())))
        .unwrap();
    manager.save_remotes(&remotes).unwrap();

    let system = FolderRepository::new(&workspace.system, false).unwrap();
    let project = FolderRepository::new(&workspace.project, true).unwrap();

    let remotes = manager.fetch_repositories(None).unwrap();
    assert_eq!(remotes.len(), 1);

    let mut read: Vec<RepositoryRef> = vec![project.clone(), system.clone()];
    read.extend(remotes.iter().cloned());
    let mut write: Vec<RepositoryRef> = remotes.clone();
    write.push(system.clone());
    write.push(project.clone());

    let dependencies: Vec<PackageDependency> =
        vec!["nunit >= 2.5".parse().unwrap(), "moq".parse().unwrap()];
    let resolution = resolve(&dependencies, &read);
    assert!(resolution.is_success());

    let events: Vec<_> = copy_packages_to_repositories(&resolution, &write)
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .all(|e| matches!(e, PropagationEvent::Copied { .. })));
    assert!(workspace.system.join("nunit-2.6.trove").exists());
    assert!(workspace.project.join("moq-4.0.trove").exists());

    // Second run reads from the project repository and has nothing to copy
    let resolution = resolve(&dependencies, &read);
    let events: Vec<_> = copy_packages_to_repositories(&resolution, &write)
        .map(|e| e.unwrap())
        .collect();
    assert!(events.is_empty());

    let outcomes: Vec<AnchorOutcome> = project
        .anchor(&resolution.packages())
        .map(|o| o.unwrap())
        .collect();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        fs::read_to_string(workspace.project.join("nunit/bin/tool.txt")).unwrap(),
        "content of nunit-2.6"
    );
}

#[test]
fn test_clean_keeps_latest_versions() {
    let workspace = workspace();
    write_package(&workspace.remote, "nunit-2.5");
    write_package(&workspace.remote, "nunit-2.6");
    write_package(&workspace.remote, "moq-4.0");

    let repository = FolderRepository::new(&workspace.remote, false).unwrap();
    let keep = repository.packages_by_name().latest_versions();
    let removed: Vec<String> = repository
        .clean(&keep)
        .map(|r| r.unwrap().full_name())
        .collect();

    assert_eq!(removed, vec!["nunit-2.5"]);

    let reopened = FolderRepository::new(&workspace.remote, false).unwrap();
    let names: Vec<String> = reopened
        .packages_by_name()
        .packages()
        .map(|p| p.full_name())
        .collect();
    assert_eq!(names, vec!["moq-4.0", "nunit-2.6"]);
}
