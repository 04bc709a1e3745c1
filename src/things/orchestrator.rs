//! Execution facade for Things 3 operations.
//!
//! Ties the engine, the parser chain, and the command generators together at
//! the script level. Each operation builds one script, runs one osascript
//! invocation, and parses the output; there is no queueing or pooling
//! because the host serializes access to its own document state.
//!
//! Output mode: read scripts run under the structured (`-s s`) flags so
//! records come back parseable. Scripts containing write or explicit-return
//! statements run in default mode; structured mode has been observed to
//! corrupt output for those.

use std::time::Duration;

use crate::applescript::{Output, ParserChain, ScriptCommand, ScriptEngine};
use crate::models::{
    AreaCreate, AreaPatch, ProjectCreate, ProjectPatch, TagCreate, TodoCreate, TodoPatch,
};
use crate::things::commands::{AreaCommands, ProjectCommands, TagCommands, TodoCommands};
use crate::things::reference::{ObjectRef, RefKind};
use crate::Result;

/// Default host application name.
pub const DEFAULT_APP_NAME: &str = "Things3";

/// Statement fragments that mark a script as a write (or explicit-return)
/// operation, which must not run in structured output mode.
const WRITE_INDICATORS: &[&str] = &["make new", "set ", "delete ", "move ", "return "];

/// Facade over the AppleScript layer for Things 3 operations.
pub struct Orchestrator {
    app_name: String,
    engine: ScriptEngine,
    chain: ParserChain,
    todos: TodoCommands,
    projects: ProjectCommands,
    areas: AreaCommands,
    tags: TagCommands,
}

impl Orchestrator {
    /// Create an orchestrator with default app name and timeout.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_APP_NAME, None)
    }

    /// Create an orchestrator for a specific app name and timeout.
    pub fn with_config(app_name: &str, timeout: Option<Duration>) -> Self {
        let engine = match timeout {
            Some(t) => ScriptEngine::with_timeout(t),
            None => ScriptEngine::new(),
        };
        Self::with_engine(engine, app_name)
    }

    pub(crate) fn with_engine(engine: ScriptEngine, app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            engine,
            chain: ParserChain::new(),
            todos: TodoCommands::new(app_name),
            projects: ProjectCommands::new(app_name),
            areas: AreaCommands::new(app_name),
            tags: TagCommands::new(app_name),
        }
    }

    /// Build, execute, and parse a command.
    pub fn run(&self, command: &ScriptCommand) -> Result<Output> {
        let script = command.build()?;
        let raw = if is_write_script(&script) {
            self.engine.execute(&script, &[], None)?
        } else {
            self.engine.execute_structured(&script, None)?
        };
        tracing::debug!(raw = %raw, "raw script output");
        self.chain.parse(&raw)
    }

    /// Execute a single statement inside the application scope.
    pub fn run_statement(&self, statement: &str) -> Result<Output> {
        let command = ScriptCommand::new()
            .tell(&self.app_name)
            .statement(statement);
        self.run(&command)
    }

    /// Query `get properties of <target>` inside the application scope.
    fn get_properties(&self, target: &str) -> Result<Output> {
        let command = ScriptCommand::new()
            .tell(&self.app_name)
            .get_property("properties", Some(target));
        self.run(&command)
    }

    /// Execute a complete raw script without parsing.
    pub fn run_raw(&self, script: &str) -> Result<String> {
        self.engine.execute(script, &[], None)
    }

    // Todo operations

    /// Create a todo; the parsed output is the new identifier.
    pub fn create_todo(&self, data: &TodoCreate) -> Result<Output> {
        self.run(&self.todos.create(data))
    }

    /// Update a todo; the parsed output is the unchanged identifier.
    pub fn update_todo(&self, todo_id: &str, patch: &TodoPatch) -> Result<Output> {
        self.run(&self.todos.update(todo_id, patch))
    }

    pub fn delete_todo(&self, todo_id: &str) -> Result<Output> {
        self.run(&self.todos.delete(todo_id))
    }

    pub fn todo_properties(&self, todo_id: &str) -> Result<Output> {
        self.get_properties(&ObjectRef::by_id(RefKind::Todo, todo_id).target())
    }

    pub fn all_todos(&self) -> Result<Output> {
        self.get_properties("to dos")
    }

    pub fn todos_in_list(&self, list_name: &str) -> Result<Output> {
        let target = ObjectRef::by_name(RefKind::List, list_name).target();
        self.get_properties(&format!("to dos of {target}"))
    }

    pub fn todos_of_project(&self, project_id: &str) -> Result<Output> {
        let target = ObjectRef::by_id(RefKind::Project, project_id).target();
        self.get_properties(&format!("to dos of {target}"))
    }

    pub fn todos_of_area(&self, area_id: &str) -> Result<Output> {
        let target = ObjectRef::by_id(RefKind::Area, area_id).target();
        self.get_properties(&format!("to dos of {target}"))
    }

    // Project operations

    pub fn create_project(&self, data: &ProjectCreate) -> Result<Output> {
        self.run(&self.projects.create(data))
    }

    pub fn update_project(&self, project_id: &str, patch: &ProjectPatch) -> Result<Output> {
        self.run(&self.projects.update(project_id, patch))
    }

    pub fn project_properties(&self, project_id: &str) -> Result<Output> {
        self.get_properties(&ObjectRef::by_id(RefKind::Project, project_id).target())
    }

    pub fn all_projects(&self) -> Result<Output> {
        self.get_properties("projects")
    }

    // Area operations

    pub fn create_area(&self, data: &AreaCreate) -> Result<Output> {
        self.run(&self.areas.create(data))
    }

    pub fn update_area(&self, area_id: &str, patch: &AreaPatch) -> Result<Output> {
        self.run(&self.areas.update(area_id, patch))
    }

    pub fn area_properties(&self, area_id: &str) -> Result<Output> {
        self.get_properties(&ObjectRef::by_id(RefKind::Area, area_id).target())
    }

    pub fn all_areas(&self) -> Result<Output> {
        self.get_properties("areas")
    }

    // Tag operations

    /// Create a tag; the parsed output is the tag name (tags are addressed
    /// by name, not identifier).
    pub fn create_tag(&self, data: &TagCreate) -> Result<Output> {
        self.run(&self.tags.create(data))
    }

    pub fn tag_properties(&self, tag_id: &str) -> Result<Output> {
        self.get_properties(&ObjectRef::by_id(RefKind::Tag, tag_id).target())
    }

    pub fn all_tags(&self) -> Result<Output> {
        self.get_properties("tags")
    }

    /// The configured application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_write_script(script: &str) -> bool {
    WRITE_INDICATORS
        .iter()
        .any(|indicator| script.contains(indicator))
}
