//! List command - list packages of a repository

use console::style;
use miette::IntoDiagnostic;
use serde::Serialize;
use std::path::Path;
use trove_repo::PackageRepository;

use crate::environment::Environment;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct PackageRow {
    name: String,
    version: String,
    full_name: String,
    expanded: bool,
}

/// Run the list command
pub fn run(env: &Environment, repository: Option<&Path>, output_json: bool) -> Result<()> {
    let repository = match repository {
        Some(path) => env.existing_repository(path)?,
        None => env.system_repository()?,
    };

    let rows: Vec<PackageRow> = repository
        .packages_by_name()
        .packages()
        .map(|package| PackageRow {
            name: package.name().to_string(),
            version: package.version().to_string(),
            full_name: package.full_name(),
            expanded: repository.is_expanded(&**package),
        })
        .collect();

    if output_json {
        let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }

    if rows.is_empty() {
        println!(
            "No packages found in {}",
            repository.base_path().display()
        );
        return Ok(());
    }

    println!(
        "{:<30} {:<15} {}",
        style("NAME").bold(),
        style("VERSION").bold(),
        style("EXPANDED").bold()
    );

    for row in &rows {
        println!(
            "{:<30} {:<15} {}",
            row.name,
            row.version,
            if row.expanded { "yes" } else { "no" }
        );
    }

    Ok(())
}
