use atrium_core::PollConfig;

use crate::commands::common::{format_edge_lines, format_org_tree, open_console, OrgEdgeItem};
use crate::error::CliError;

pub async fn run_set(employee: &str, manager: &str, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let edge = engine.service().add_edge(employee, manager).await?;

    println!("{} now reports to {}", edge.employee_id, edge.reports_to);
    Ok(())
}

pub async fn run_remove(employee: &str, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    engine.service().remove_edge(employee).await?;

    println!("Removed reporting line for {}", employee.trim());
    Ok(())
}

pub async fn run_list(as_json: bool, config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let edges = engine.service().hierarchy_edges().await?;

    if as_json {
        let items = edges
            .iter()
            .map(|(id, edge)| OrgEdgeItem {
                id: id.to_string(),
                edge: edge.clone(),
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if edges.is_empty() {
        println!("No reporting lines recorded");
    } else {
        for line in format_edge_lines(&edges) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_tree(config: &PollConfig) -> Result<(), CliError> {
    let engine = open_console(config).await?;
    let edges = engine.service().hierarchy_edges().await?;

    if edges.is_empty() {
        println!("No reporting lines recorded");
        return Ok(());
    }

    let lines = format_org_tree(&edges);
    if lines.is_empty() {
        // Cyclic foreign data has no top-level manager to root the tree at.
        for line in format_edge_lines(&edges) {
            println!("{line}");
        }
    } else {
        for line in lines {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_chain(employee: &str, config: &PollConfig) -> Result<(), CliError> {
    let employee = employee.trim();
    let engine = open_console(config).await?;
    let chain = engine.service().manager_chain(employee).await?;

    if chain.is_empty() {
        println!("No managers recorded for '{employee}'");
    } else {
        let mut path = vec![employee.to_string()];
        path.extend(chain);
        println!("{}", path.join(" -> "));
    }

    Ok(())
}

pub async fn run_reports(manager: &str, config: &PollConfig) -> Result<(), CliError> {
    let manager = manager.trim();
    let engine = open_console(config).await?;
    let reports = engine.service().direct_reports(manager).await?;

    if reports.is_empty() {
        println!("No direct reports for '{manager}'");
    } else {
        for name in reports {
            println!("{name}");
        }
    }

    Ok(())
}
