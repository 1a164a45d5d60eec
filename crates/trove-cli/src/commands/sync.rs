//! Sync command - resolve dependencies and bring them closer to the project

use console::style;
use trove_core::PackageDependency;
use trove_repo::{
    PackageRef, PropagationEvent, RepositoryRef, SupportsAnchoring,
    copy_packages_to_repositories, resolve,
};

use crate::display;
use crate::environment::{Environment, read_chain, write_chain};
use crate::error::{CliError, Result};

pub fn run(env: &Environment, dependencies: &[String], hint: Option<&str>) -> Result<()> {
    let dependencies = dependencies
        .iter()
        .map(|d| d.parse::<PackageDependency>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let system = env.system_repository()?;
    let project = env.project_repository()?;
    let remotes = env.remotes().fetch_repositories(hint)?;

    let read = read_chain(project.as_ref(), &system, &remotes);
    let write = write_chain(project.as_ref(), &system, &remotes);
    tracing::debug!(
        "Resolving {} dependencies against {} repositories",
        dependencies.len(),
        read.len()
    );

    let resolution = resolve(&dependencies, &read);

    let mut copied = 0;
    let mut failed = 0;
    for event in copy_packages_to_repositories(&resolution, &write) {
        match event {
            Ok(event) => {
                if matches!(event, PropagationEvent::Copied { .. }) {
                    copied += 1;
                }
                display::print_event(&event);
            }
            Err(e) => {
                failed += 1;
                display::print_failure(&e);
            }
        }
    }

    if !resolution.is_success() {
        let names: Vec<String> = resolution.unresolved.iter().map(|d| d.to_string()).collect();
        return Err(CliError::unresolved(names.join(", ")));
    }

    if let Some(project) = project {
        let project: RepositoryRef = project;
        if let Some(anchoring) = project.feature::<dyn SupportsAnchoring>() {
            let index = project.packages_by_name();
            let packages: Vec<PackageRef> = resolution
                .packages()
                .iter()
                .filter_map(|p| index.find_by_full_name(&p.full_name()).cloned())
                .collect();

            for outcome in anchoring.anchor(&packages) {
                match outcome {
                    Ok(outcome) => display::print_anchor(&outcome),
                    Err(e) => {
                        failed += 1;
                        display::print_failure(&e);
                    }
                }
            }
        }
    }

    if failed > 0 {
        display::print_summary("Copied", copied, failed);
        return Err(CliError::Partial { failed });
    }

    if copied == 0 {
        println!(
            "{} All dependencies up to date",
            style("✓").green().bold()
        );
    } else {
        display::print_summary("Copied", copied, failed);
    }
    Ok(())
}
