//! MCP (Model Context Protocol) server implementation.
//!
//! Exposes the Things 3 operations as MCP tools over a stdio JSON-RPC
//! transport. The server instance is constructed by the `serve` command and
//! owns its `ThingsApi`; there is no ambient global.

pub mod server;

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::models::{Field, ProjectCreate, ProjectPatch, Status, TodoCreate, TodoPatch};
use crate::things::ThingsApi;
use crate::things::reference::{ObjectRef, RefKind};
use crate::{Error, Result};

pub use server::run_stdio;

/// Protocol version echoed to clients. Kept at the widely deployed baseline.
pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "things-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The MCP stdio server: protocol state plus the Things API it fronts.
pub struct McpServer {
    initialized: bool,
    api: ThingsApi,
}

impl McpServer {
    pub fn new(api: ThingsApi) -> Self {
        Self {
            initialized: false,
            api,
        }
    }

    /// Handle one JSON-RPC request. Returns `None` for notifications.
    pub fn handle(&mut self, request: server::JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();

        if method == "initialize" {
            return Some(server::json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": MCP_VERSION,
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        if method == "notifications/initialized" {
            self.initialized = true;
            return None;
        }

        if !self.initialized && method != "ping" {
            return Some(server::json_rpc_error(
                request.id,
                -32002,
                "Server not initialized",
            ));
        }

        match method {
            "ping" => Some(server::json_rpc_response(request.id, json!({}))),
            "tools/list" => Some(server::json_rpc_response(
                request.id,
                json!({ "tools": tool_definitions() }),
            )),
            "tools/call" => {
                let Some(params) = request.params.as_ref().and_then(Value::as_object) else {
                    return Some(server::json_rpc_error(
                        request.id,
                        -32602,
                        "params must be an object",
                    ));
                };
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let empty = Map::new();
                let args = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .unwrap_or(&empty);

                let response = match self.call_tool(name, args) {
                    Ok(body) => json!({
                        "content": [{
                            "type": "text",
                            "text": serde_json::to_string_pretty(&body)
                                .unwrap_or_else(|_| "null".to_string()),
                        }],
                        "isError": false
                    }),
                    Err(err) => json!({
                        "content": [{ "type": "text", "text": err.to_string() }],
                        "isError": true
                    }),
                };
                Some(server::json_rpc_response(request.id, response))
            }
            _ => Some(server::json_rpc_error(
                request.id,
                -32601,
                &format!("Method not found: {method}"),
            )),
        }
    }

    /// Dispatch a tool call to the API. Tool failures surface in-band as
    /// `isError` results, not transport errors.
    fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<Value> {
        match name {
            "get_todo" => Ok(json!(self.api.get_todo(&required_str(args, "todo_id")?)?)),
            "get_all_todos" => Ok(json!(self.api.get_all_todos()?)),
            "get_todos_by_list" => Ok(json!(
                self.api.get_todos_by_list(&required_str(args, "list_name")?)?
            )),
            "get_todos_by_project" => Ok(json!(
                self.api
                    .get_todos_by_project(&required_str(args, "project_id")?)?
            )),
            "get_todos_by_area" => Ok(json!(
                self.api.get_todos_by_area(&required_str(args, "area_id")?)?
            )),
            "get_todos_by_tag" => Ok(json!(
                self.api.get_todos_by_tag(&required_str(args, "tag_name")?)?
            )),
            "create_todo" => {
                let data = todo_create_from_args(args)?;
                Ok(json!(self.api.create_todo(&data)?))
            }
            "update_todo" => {
                let todo_id = required_str(args, "todo_id")?;
                let patch = todo_patch_from_args(args)?;
                Ok(json!(self.api.update_todo(&todo_id, &patch)?))
            }
            "delete_todo" => {
                self.api.delete_todo(&required_str(args, "todo_id")?)?;
                Ok(json!({ "deleted": true }))
            }
            "get_project" => Ok(json!(
                self.api.get_project(&required_str(args, "project_id")?)?
            )),
            "get_all_projects" => Ok(json!(self.api.get_all_projects()?)),
            "get_projects_by_area" => Ok(json!(
                self.api
                    .get_projects_by_area(&required_str(args, "area_id")?)?
            )),
            "create_project" => {
                let data = project_create_from_args(args)?;
                Ok(json!(self.api.create_project(&data)?))
            }
            "update_project" => {
                let project_id = required_str(args, "project_id")?;
                let patch = project_patch_from_args(args)?;
                Ok(json!(self.api.update_project(&project_id, &patch)?))
            }
            "get_area" => Ok(json!(self.api.get_area(&required_str(args, "area_id")?)?)),
            "get_all_areas" => Ok(json!(self.api.get_all_areas()?)),
            "get_tag" => Ok(json!(self.api.get_tag(&required_str(args, "tag_id")?)?)),
            "get_all_tags" => Ok(json!(self.api.get_all_tags()?)),
            _ => Err(Error::InvalidInput(format!("unknown tool: {name}"))),
        }
    }
}

/// Build a `TodoCreate` from tool arguments.
fn todo_create_from_args(args: &Map<String, Value>) -> Result<TodoCreate> {
    Ok(TodoCreate {
        name: required_str(args, "name")?,
        notes: optional_str(args, "notes"),
        due_date: optional_date(args, "due_date")?,
        tags: optional_str_list(args, "tags"),
        project: optional_str(args, "project_id")
            .map(|id| ObjectRef::by_id(RefKind::Project, id).target()),
        area: optional_str(args, "area_id").map(|id| ObjectRef::by_id(RefKind::Area, id).target()),
        when: optional_str(args, "when"),
        checklist: optional_str_list(args, "checklist"),
    })
}

/// Build a `TodoPatch` from tool arguments, preserving the tri-state: a key
/// that is absent leaves the field unchanged; null or an empty string
/// clears it.
fn todo_patch_from_args(args: &Map<String, Value>) -> Result<TodoPatch> {
    Ok(TodoPatch {
        name: optional_str(args, "name"),
        notes: optional_str(args, "notes"),
        status: optional_status(args)?,
        due_date: tri_state_date(args, "due_date")?,
        tags: optional_str_list(args, "tags"),
        project: tri_state_ref(args, "project_id", RefKind::Project),
        area: tri_state_ref(args, "area_id", RefKind::Area),
        when: optional_str(args, "when"),
    })
}

fn project_create_from_args(args: &Map<String, Value>) -> Result<ProjectCreate> {
    Ok(ProjectCreate {
        name: required_str(args, "name")?,
        notes: optional_str(args, "notes"),
        deadline: optional_date(args, "deadline")?,
        tags: optional_str_list(args, "tags"),
        area: optional_str(args, "area_id").map(|id| ObjectRef::by_id(RefKind::Area, id).target()),
        when: optional_str(args, "when"),
    })
}

fn project_patch_from_args(args: &Map<String, Value>) -> Result<ProjectPatch> {
    Ok(ProjectPatch {
        name: optional_str(args, "name"),
        notes: optional_str(args, "notes"),
        status: optional_status(args)?,
        deadline: tri_state_date(args, "deadline")?,
        tags: optional_str_list(args, "tags"),
        area: tri_state_ref(args, "area_id", RefKind::Area),
        when: optional_str(args, "when"),
    })
}

fn required_str(args: &Map<String, Value>, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("missing required argument: {key}")))
}

fn optional_str(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_str_list(args: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = args.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn parse_iso_date(key: &str, text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("{key} must be YYYY-MM-DD, got: {text}")))
}

fn optional_date(args: &Map<String, Value>, key: &str) -> Result<Option<NaiveDate>> {
    match args.get(key).and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(Some(parse_iso_date(key, text)?)),
        _ => Ok(None),
    }
}

/// Absent key: leave unchanged. Null or empty string: clear. Date text: set.
fn tri_state_date(args: &Map<String, Value>, key: &str) -> Result<Field<NaiveDate>> {
    match args.get(key) {
        None => Ok(Field::Absent),
        Some(Value::Null) => Ok(Field::Clear),
        Some(Value::String(text)) if text.is_empty() => Ok(Field::Clear),
        Some(Value::String(text)) => Ok(Field::Set(parse_iso_date(key, text)?)),
        Some(other) => Err(Error::InvalidInput(format!(
            "{key} must be a string, got: {other}"
        ))),
    }
}

/// Absent key: leave unchanged. Null or empty string: clear the
/// relationship. An identifier: set via a by-id reference.
fn tri_state_ref(args: &Map<String, Value>, key: &str, kind: RefKind) -> Field<String> {
    match args.get(key) {
        None => Field::Absent,
        Some(Value::String(id)) if !id.is_empty() => {
            Field::Set(ObjectRef::by_id(kind, id.clone()).target())
        }
        Some(_) => Field::Clear,
    }
}

fn optional_status(args: &Map<String, Value>) -> Result<Option<Status>> {
    match args.get("status").and_then(Value::as_str) {
        Some(text) => Status::parse(text).map(Some).ok_or_else(|| {
            Error::InvalidInput(format!(
                "status must be open, completed, or canceled, got: {text}"
            ))
        }),
        None => Ok(None),
    }
}

/// Tool definitions advertised via `tools/list`.
pub fn tool_definitions() -> Vec<Value> {
    fn tool(name: &str, description: &str, schema: Value) -> Value {
        json!({ "name": name, "description": description, "inputSchema": schema })
    }

    fn object_schema(properties: Value, required: &[&str]) -> Value {
        json!({ "type": "object", "properties": properties, "required": required })
    }

    let id_arg = |key: &str, description: &str| -> Value {
        json!({ key: { "type": "string", "description": description } })
    };

    vec![
        tool(
            "get_todo",
            "Get a single todo by ID; null if it does not exist",
            object_schema(id_arg("todo_id", "The ID of the todo"), &["todo_id"]),
        ),
        tool(
            "get_all_todos",
            "Get all todos",
            object_schema(json!({}), &[]),
        ),
        tool(
            "get_todos_by_list",
            "Get todos from a list: Inbox, Today, Upcoming, Anytime, Someday, or Logbook",
            object_schema(id_arg("list_name", "Name of the list"), &["list_name"]),
        ),
        tool(
            "get_todos_by_project",
            "Get todos belonging to a project",
            object_schema(id_arg("project_id", "The ID of the project"), &["project_id"]),
        ),
        tool(
            "get_todos_by_area",
            "Get todos belonging to an area",
            object_schema(id_arg("area_id", "The ID of the area"), &["area_id"]),
        ),
        tool(
            "get_todos_by_tag",
            "Get todos carrying a tag",
            object_schema(id_arg("tag_name", "Name of the tag"), &["tag_name"]),
        ),
        tool(
            "create_todo",
            "Create a new todo and return it",
            object_schema(
                json!({
                    "name": { "type": "string", "description": "The title of the todo" },
                    "notes": { "type": "string", "description": "Notes body" },
                    "due_date": { "type": "string", "description": "Due date, YYYY-MM-DD" },
                    "tags": { "type": "array", "items": { "type": "string" }, "description": "Tag names" },
                    "project_id": { "type": "string", "description": "Project to assign the todo to" },
                    "area_id": { "type": "string", "description": "Area to assign the todo to" },
                    "when": { "type": "string", "description": "Scheduling keyword: today, tomorrow, upcoming, anytime, someday" },
                    "checklist": { "type": "array", "items": { "type": "string" }, "description": "Checklist item names" }
                }),
                &["name"],
            ),
        ),
        tool(
            "update_todo",
            "Update a todo. Omitted fields stay unchanged; null or empty clears a field",
            object_schema(
                json!({
                    "todo_id": { "type": "string", "description": "The ID of the todo" },
                    "name": { "type": "string", "description": "New title" },
                    "notes": { "type": "string", "description": "New notes body" },
                    "due_date": { "type": "string", "description": "New due date, YYYY-MM-DD; empty clears it" },
                    "tags": { "type": "array", "items": { "type": "string" }, "description": "Replacement tag names; empty list clears" },
                    "project_id": { "type": "string", "description": "Project to move the todo to; empty removes it to the Inbox" },
                    "area_id": { "type": "string", "description": "Area to assign; empty clears" },
                    "when": { "type": "string", "description": "Scheduling keyword" },
                    "status": { "type": "string", "description": "open, completed, or canceled" }
                }),
                &["todo_id"],
            ),
        ),
        tool(
            "delete_todo",
            "Delete a todo",
            object_schema(id_arg("todo_id", "The ID of the todo"), &["todo_id"]),
        ),
        tool(
            "get_project",
            "Get a single project by ID; null if it does not exist",
            object_schema(id_arg("project_id", "The ID of the project"), &["project_id"]),
        ),
        tool(
            "get_all_projects",
            "Get all projects",
            object_schema(json!({}), &[]),
        ),
        tool(
            "get_projects_by_area",
            "Get projects belonging to an area",
            object_schema(id_arg("area_id", "The ID of the area"), &["area_id"]),
        ),
        tool(
            "create_project",
            "Create a new project and return it",
            object_schema(
                json!({
                    "name": { "type": "string", "description": "The title of the project" },
                    "notes": { "type": "string", "description": "Notes body" },
                    "deadline": { "type": "string", "description": "Deadline, YYYY-MM-DD" },
                    "tags": { "type": "array", "items": { "type": "string" }, "description": "Tag names" },
                    "area_id": { "type": "string", "description": "Area to assign the project to" },
                    "when": { "type": "string", "description": "Scheduling keyword: anytime or someday" }
                }),
                &["name"],
            ),
        ),
        tool(
            "update_project",
            "Update a project. Omitted fields stay unchanged; null or empty clears a field",
            object_schema(
                json!({
                    "project_id": { "type": "string", "description": "The ID of the project" },
                    "name": { "type": "string", "description": "New title" },
                    "notes": { "type": "string", "description": "New notes body" },
                    "deadline": { "type": "string", "description": "New deadline, YYYY-MM-DD; empty clears it" },
                    "tags": { "type": "array", "items": { "type": "string" }, "description": "Replacement tag names; empty list clears" },
                    "area_id": { "type": "string", "description": "Area to assign; empty clears" },
                    "when": { "type": "string", "description": "Scheduling keyword" },
                    "status": { "type": "string", "description": "open, completed, or canceled" }
                }),
                &["project_id"],
            ),
        ),
        tool(
            "get_area",
            "Get a single area by ID; null if it does not exist",
            object_schema(id_arg("area_id", "The ID of the area"), &["area_id"]),
        ),
        tool(
            "get_all_areas",
            "Get all areas",
            object_schema(json!({}), &[]),
        ),
        tool(
            "get_tag",
            "Get a single tag by ID; null if it does not exist",
            object_schema(id_arg("tag_id", "The ID of the tag"), &["tag_id"]),
        ),
        tool(
            "get_all_tags",
            "Get all tags",
            object_schema(json!({}), &[]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_tool_definitions_complete() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();

        for expected in [
            "get_todo",
            "get_all_todos",
            "get_todos_by_list",
            "get_todos_by_project",
            "get_todos_by_area",
            "get_todos_by_tag",
            "create_todo",
            "update_todo",
            "delete_todo",
            "get_project",
            "get_all_projects",
            "get_projects_by_area",
            "create_project",
            "update_project",
            "get_area",
            "get_all_areas",
            "get_tag",
            "get_all_tags",
        ] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }
    }

    #[test]
    fn test_tool_definitions_have_schemas() {
        for tool in tool_definitions() {
            assert!(
                tool["inputSchema"]["type"] == "object",
                "tool {} lacks an object schema",
                tool["name"]
            );
        }
    }

    #[test]
    fn test_todo_create_from_args() {
        let data = todo_create_from_args(&args(json!({
            "name": "Buy milk",
            "tags": ["errand"],
            "project_id": "P1",
            "when": "today"
        })))
        .unwrap();

        assert_eq!(data.name, "Buy milk");
        assert_eq!(data.tags, Some(vec!["errand".to_string()]));
        assert_eq!(data.project.as_deref(), Some("project id \"P1\""));
        assert_eq!(data.when.as_deref(), Some("today"));
        assert_eq!(data.due_date, None);
    }

    #[test]
    fn test_todo_create_requires_name() {
        let err = todo_create_from_args(&args(json!({}))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_todo_create_rejects_bad_date() {
        let err = todo_create_from_args(&args(json!({
            "name": "x",
            "due_date": "June 20"
        })))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_todo_patch_tri_state_due_date() {
        // Absent key leaves the field unchanged.
        let patch = todo_patch_from_args(&args(json!({ "todo_id": "x" }))).unwrap();
        assert_eq!(patch.due_date, Field::Absent);

        // Null clears.
        let patch =
            todo_patch_from_args(&args(json!({ "todo_id": "x", "due_date": null }))).unwrap();
        assert_eq!(patch.due_date, Field::Clear);

        // Empty string clears.
        let patch = todo_patch_from_args(&args(json!({ "todo_id": "x", "due_date": "" }))).unwrap();
        assert_eq!(patch.due_date, Field::Clear);

        // A date sets.
        let patch =
            todo_patch_from_args(&args(json!({ "todo_id": "x", "due_date": "2025-07-01" })))
                .unwrap();
        assert_eq!(
            patch.due_date,
            Field::Set(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
        );
    }

    #[test]
    fn test_todo_patch_tri_state_project() {
        let patch = todo_patch_from_args(&args(json!({ "todo_id": "x" }))).unwrap();
        assert_eq!(patch.project, Field::Absent);

        let patch =
            todo_patch_from_args(&args(json!({ "todo_id": "x", "project_id": "" }))).unwrap();
        assert_eq!(patch.project, Field::Clear);

        let patch =
            todo_patch_from_args(&args(json!({ "todo_id": "x", "project_id": "P1" }))).unwrap();
        assert_eq!(patch.project, Field::Set("project id \"P1\"".to_string()));
    }

    #[test]
    fn test_todo_patch_rejects_unknown_status() {
        let err =
            todo_patch_from_args(&args(json!({ "todo_id": "x", "status": "paused" }))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_project_patch_deadline_clear() {
        let patch =
            project_patch_from_args(&args(json!({ "project_id": "P1", "deadline": null })))
                .unwrap();
        assert_eq!(patch.deadline, Field::Clear);
    }

    #[test]
    fn test_unknown_tool_is_invalid_input() {
        let server = McpServer::new(ThingsApi::new());
        let err = server.call_tool("frobnicate", &Map::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_initialize_before_anything_else() {
        let mut server = McpServer::new(ThingsApi::new());

        let response = server
            .handle(server::JsonRpcRequest {
                _jsonrpc: Some("2.0".to_string()),
                method: "tools/list".to_string(),
                id: Some(json!(1)),
                params: None,
            })
            .unwrap();
        assert_eq!(response["error"]["code"], -32002);

        let response = server
            .handle(server::JsonRpcRequest {
                _jsonrpc: Some("2.0".to_string()),
                method: "initialize".to_string(),
                id: Some(json!(2)),
                params: None,
            })
            .unwrap();
        assert_eq!(response["result"]["protocolVersion"], MCP_VERSION);

        assert!(
            server
                .handle(server::JsonRpcRequest {
                    _jsonrpc: None,
                    method: "notifications/initialized".to_string(),
                    id: None,
                    params: None,
                })
                .is_none()
        );

        let response = server
            .handle(server::JsonRpcRequest {
                _jsonrpc: None,
                method: "tools/list".to_string(),
                id: Some(json!(3)),
                params: None,
            })
            .unwrap();
        assert!(response["result"]["tools"].as_array().unwrap().len() >= 18);
    }

    #[test]
    fn test_unknown_method_not_found() {
        let mut server = McpServer::new(ThingsApi::new());
        server.initialized = true;

        let response = server
            .handle(server::JsonRpcRequest {
                _jsonrpc: None,
                method: "resources/list".to_string(),
                id: Some(json!(9)),
                params: None,
            })
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }
}
