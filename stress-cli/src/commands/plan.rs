//! Show the resolved launch plan without starting anything.

use anyhow::{Context, Result};
use rados_stress_core::{ArgumentVector, LaunchSpec};
use rados_stress_runner::{Cluster, Endpoint};
use rados_stress_types::ClientRole;
use serde::Serialize;

use crate::config::RunFile;

/// Launch plan for a whole run.
#[derive(Debug, Serialize)]
pub struct Plan {
    /// Positional arguments shared by every client.
    pub args: ArgumentVector,
    /// One entry per client role, in configured order.
    pub clients: Vec<PlannedClient>,
}

/// What one client would run, and where.
#[derive(Debug, Serialize)]
pub struct PlannedClient {
    /// Client role.
    pub role: ClientRole,
    /// Host the role resolves to.
    pub endpoint: Endpoint,
    /// Process to start.
    pub launch: LaunchSpec,
}

/// Resolve workload, roles and hosts into a plan.
pub fn build(file: &RunFile) -> Result<Plan> {
    let workload = file.workload().context("invalid workload")?;
    let roles = workload.client_roles().context("invalid workload")?;
    let args = workload.resolve().context("invalid workload")?;

    let inventory = file.inventory(&roles);
    let template = file.launch.template();

    let mut clients = Vec::with_capacity(roles.len());
    for role in roles {
        let endpoint = inventory.resolve_endpoint(&role)?;
        let launch = template.spec_for(&role, &args);
        clients.push(PlannedClient {
            role,
            endpoint,
            launch,
        });
    }

    Ok(Plan { args, clients })
}

/// Run the plan command.
pub fn run(file: &RunFile, json: bool) -> Result<()> {
    let plan = build(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("=== rados-stress plan ===");
    println!();
    println!("Arguments: {}", plan.args.join(" "));
    println!("Clients:   {}", plan.clients.len());
    for client in &plan.clients {
        println!();
        println!("{} -> {} ({})", client.role, client.endpoint, client.endpoint.destination());
        println!("  {}", client.launch.shell_command());
    }

    Ok(())
}
