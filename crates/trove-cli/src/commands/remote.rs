//! Remote management commands

use console::style;
use trove_repo::{RemoteEndpoint, RemoteRepositories, RemoteRepository, SupportsPublishing};

use crate::environment::Environment;
use crate::error::{CliError, Result};

/// List configured remotes in fetch order
pub fn list(env: &Environment, hint: Option<&str>) -> Result<()> {
    let remotes = env.remotes().load_remotes()?;
    let ambient = match hint {
        Some(hint) if remotes.get(hint).is_none() => env.remotes().resolve_user_input(hint)?,
        _ => None,
    };

    if remotes.is_empty() && ambient.is_none() {
        println!("No remotes configured.");
        println!();
        println!("Add one with: trove remote add <name> <locator>");
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:<10} {}",
        style("NAME").bold(),
        style("PRIORITY").bold(),
        style("PUBLISH").bold(),
        style("TOKEN").bold()
    );

    if let Some(repository) = ambient {
        println!(
            "{:<20} {:<10} {:<10} {}",
            repository.name(),
            style("ambient").dim(),
            yes_no(repository.feature::<dyn SupportsPublishing>().is_some()),
            repository.token()
        );
    }

    for remote in remotes.ordered(hint) {
        println!(
            "{:<20} {:<10} {:<10} {}",
            remote.name,
            remote.priority,
            yes_no(!remote.publish.is_empty()),
            remote.fetch.token
        );
    }

    Ok(())
}

/// Add a remote resolved from a user-typed locator
pub fn add(
    env: &Environment,
    name: &str,
    locator: &str,
    priority: Option<i32>,
    username: Option<&str>,
    password: Option<&str>,
    no_publish: bool,
) -> Result<()> {
    let repository = env.remotes().resolve_user_input(locator)?.ok_or_else(|| {
        CliError::usage_with_help(
            format!("Cannot resolve '{}' to a repository", locator),
            "Pass an existing directory or a file:// URL",
        )
    })?;

    let mut endpoint = RemoteEndpoint::new(repository.token());
    match (username, password) {
        (Some(username), password) => {
            endpoint = endpoint.with_credentials(username, password.unwrap_or_default());
        }
        (None, Some(_)) => {
            return Err(CliError::usage("--password requires --username"));
        }
        (None, None) => {}
    }

    let mut remotes = env.remotes().load_remotes()?;
    let priority = priority.unwrap_or_else(|| next_priority(&remotes));

    let publishes =
        !no_publish && repository.feature::<dyn SupportsPublishing>().is_some();
    let mut remote = RemoteRepository::new(name, priority, endpoint.clone());
    if publishes {
        remote = remote.with_publish(endpoint);
    }

    remotes.add(remote)?;
    env.remotes().save_remotes(&remotes)?;

    println!(
        "\"{}\" has been added to your remotes ({}, priority {})",
        name,
        repository.repository_type(),
        priority
    );
    if !publishes {
        println!("{}", style("Publishing to this remote is disabled").dim());
    }

    Ok(())
}

/// Remove a configured remote
pub fn remove(env: &Environment, name: &str) -> Result<()> {
    let mut remotes = env.remotes().load_remotes()?;
    let removed = remotes.remove(name)?;
    env.remotes().save_remotes(&remotes)?;

    println!("\"{}\" has been removed from your remotes", removed.name);
    Ok(())
}

/// Priority placing a new remote after every existing one
fn next_priority(remotes: &RemoteRepositories) -> i32 {
    remotes
        .remotes
        .iter()
        .map(|r| r.priority)
        .max()
        .map_or(1, |p| p.saturating_add(1))
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
