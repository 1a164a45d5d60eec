//! Clean command - remove everything but the latest version of each package

use std::path::Path;
use trove_repo::{PackageRepository, SupportsCleaning};

use crate::display;
use crate::environment::Environment;
use crate::error::{CliError, Result};

pub fn run(env: &Environment, repository: Option<&Path>) -> Result<()> {
    let repository = match repository {
        Some(path) => env.existing_repository(path)?,
        None => env.system_repository()?,
    };

    let keep = repository.packages_by_name().latest_versions();

    let mut removed = 0;
    let mut failed = 0;
    for result in repository.clean(&keep) {
        match result {
            Ok(package) => {
                removed += 1;
                display::print_removed(&package);
            }
            Err(e) => {
                failed += 1;
                display::print_failure(&e);
            }
        }
    }

    if removed == 0 && failed == 0 {
        println!("Nothing to clean in {}", repository.base_path().display());
        return Ok(());
    }

    display::print_summary("Removed", removed, failed);
    if failed > 0 {
        return Err(CliError::Partial { failed });
    }
    Ok(())
}
