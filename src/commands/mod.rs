//! Command implementations for the things-mcp CLI.
//!
//! - `serve` - run the MCP stdio server
//! - `manifest` - print tool definitions
//! - `today` - render the Today list as a text table

use std::collections::HashMap;

use crate::mcp::{self, McpServer};
use crate::models::Status;
use crate::things::ThingsApi;
use crate::{Error, Result};

/// Run the MCP stdio server until the client closes the transport.
pub fn serve(api: ThingsApi) -> Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nShutting down server gracefully...");
        std::process::exit(0);
    })
    .map_err(|e| Error::Other(format!("failed to install signal handler: {e}")))?;

    tracing::info!("starting MCP stdio server");
    let mut server = McpServer::new(api);
    mcp::run_stdio(&mut server)?;
    Ok(())
}

/// Print the MCP tool definitions as JSON.
pub fn manifest() -> Result<()> {
    let manifest = serde_json::json!({ "tools": mcp::tool_definitions() });
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

/// Render the Today list as an aligned text table with project and area
/// names resolved (and cached per invocation, one lookup per distinct id).
pub fn today(api: &ThingsApi) -> Result<()> {
    let todos = api.get_todos_by_list("Today")?;

    if todos.is_empty() {
        println!("No todos in the Today list.");
        return Ok(());
    }

    println!("Today's Todos ({} items)", todos.len());
    println!(
        "{:<40} {:<12} {:<20} {:<20} {:<20} {:<10}",
        "NAME", "DUE", "PROJECT", "AREA", "TAGS", "STATUS"
    );

    let mut project_names: HashMap<String, String> = HashMap::new();
    let mut area_names: HashMap<String, String> = HashMap::new();

    for todo in &todos {
        let due = todo
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let project = resolve_name(todo.project.as_deref(), &mut project_names, |id| {
            Ok(api.get_project(id)?.map(|p| p.name))
        })?;
        let area = resolve_name(todo.area.as_deref(), &mut area_names, |id| {
            Ok(api.get_area(id)?.map(|a| a.name))
        })?;
        let status = todo
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "open".to_string());

        println!(
            "{:<40} {:<12} {:<20} {:<20} {:<20} {:<10}",
            clip(&todo.name, 40),
            due,
            clip(&project, 20),
            clip(&area, 20),
            clip(&todo.tags.join(", "), 20),
            status
        );
    }

    let completed = todos
        .iter()
        .filter(|todo| todo.status == Some(Status::Completed))
        .count();
    println!("Open: {} | Completed: {}", todos.len() - completed, completed);

    Ok(())
}

/// Resolve a canonical reference (`project id ABC`) to a display name,
/// consulting the cache first. Unresolvable references fall back to the
/// raw identifier.
fn resolve_name(
    reference: Option<&str>,
    cache: &mut HashMap<String, String>,
    lookup: impl Fn(&str) -> Result<Option<String>>,
) -> Result<String> {
    let Some(reference) = reference else {
        return Ok("-".to_string());
    };

    let Some(id) = extract_id(reference) else {
        return Ok(reference.to_string());
    };

    if let Some(name) = cache.get(id) {
        return Ok(name.clone());
    }

    let name = match lookup(id) {
        Ok(Some(name)) => name,
        Ok(None) => id.to_string(),
        // A broken lookup should not take down the whole report.
        Err(_) => id.to_string(),
    };
    cache.insert(id.to_string(), name.clone());
    Ok(name)
}

/// The identifier portion of a canonical reference token.
fn extract_id(reference: &str) -> Option<&str> {
    reference.split_once(" id ").map(|(_, id)| id)
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{clipped}...")
}
