//! Publish command - push an archive to the first publishing remote

use console::style;
use std::fs::File;
use std::path::Path;
use trove_repo::SupportsPublishing;

use crate::display;
use crate::environment::Environment;
use crate::error::{CliError, Result};

pub fn run(env: &Environment, archive: &Path, hint: Option<&str>) -> Result<()> {
    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CliError::usage(format!("'{}' is not an archive file", archive.display()))
        })?;

    if !archive.is_file() {
        return Err(CliError::usage(format!(
            "Archive '{}' does not exist",
            archive.display()
        )));
    }

    let mut groups = env.remotes().publish_repositories(hint)?.into_iter();
    let targets = groups.next().ok_or_else(|| {
        CliError::usage_with_help(
            "No remote accepts published packages",
            "Add a remote with 'trove remote add' or pass --remote <dir>",
        )
    })?;
    if targets.is_empty() {
        return Err(CliError::usage(
            "None of the publish endpoints of the first remote could be resolved",
        ));
    }

    let mut published = 0;
    let mut failed = 0;
    for repository in &targets {
        let Some(publisher) = repository.feature::<dyn SupportsPublishing>() else {
            tracing::warn!("{} does not accept published packages", repository.name());
            continue;
        };

        let mut stream = File::open(archive)?;
        match publisher.publish(file_name, &mut stream) {
            Ok(Some(package)) => {
                published += 1;
                println!(
                    "{} Published {} to {}",
                    style("✓").green().bold(),
                    style(package.full_name()).cyan(),
                    repository.name()
                );
            }
            Ok(None) => println!(
                "{} {} already present in {}",
                style("·").dim(),
                file_name,
                repository.name()
            ),
            Err(e) => {
                failed += 1;
                display::print_failure(&e);
            }
        }
    }

    display::print_summary("Published to", published, failed);
    if failed > 0 {
        return Err(CliError::Partial { failed });
    }
    Ok(())
}
