//! Typed entity API over the orchestrator.
//!
//! Converts parsed, normalized host records into the typed models, maps the
//! host's "Can't get <type> id" lookup failures to empty results, and
//! re-fetches entities after writes so callers always get the host's own
//! view of what they just changed.

use chrono::{NaiveDate, NaiveDateTime};

use crate::applescript::{Output, Record};
use crate::models::{
    Area, AreaCreate, AreaPatch, ClassType, Project, ProjectCreate, ProjectPatch, Status, Tag,
    Todo, TodoCreate, TodoPatch,
};
use crate::things::orchestrator::Orchestrator;
use crate::things::properties;
use crate::things::reference::RefKind;
use crate::{Error, Result};

/// Formats the host uses for date output, tried in order. The primary form
/// is locale text like `Friday, June 20, 2025 at 20:24:26`.
const DATETIME_FORMATS: &[&str] = &[
    "%A, %B %e, %Y at %H:%M:%S",
    "%B %e, %Y at %H:%M:%S",
    "%A, %B %e, %Y at %I:%M:%S %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Typed API for Things 3 entities.
pub struct ThingsApi {
    orchestrator: Orchestrator,
}

impl ThingsApi {
    pub fn new() -> Self {
        Self {
            orchestrator: Orchestrator::new(),
        }
    }

    pub fn with_config(app_name: &str, timeout: Option<std::time::Duration>) -> Self {
        Self {
            orchestrator: Orchestrator::with_config(app_name, timeout),
        }
    }

    pub(crate) fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    // Todo reads

    /// Get a single todo by ID, or `None` if it does not exist.
    pub fn get_todo(&self, todo_id: &str) -> Result<Option<Todo>> {
        let output = match self.orchestrator.todo_properties(todo_id) {
            Ok(output) => output,
            Err(ref err) if is_not_found(err, RefKind::Todo) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(single_record(output).and_then(|r| parse_todo(&r)))
    }

    pub fn get_all_todos(&self) -> Result<Vec<Todo>> {
        Ok(parse_all(self.orchestrator.all_todos()?, parse_todo))
    }

    /// Get todos from a named list (Inbox, Today, Upcoming, Anytime,
    /// Someday, Logbook).
    pub fn get_todos_by_list(&self, list_name: &str) -> Result<Vec<Todo>> {
        Ok(parse_all(
            self.orchestrator.todos_in_list(list_name)?,
            parse_todo,
        ))
    }

    pub fn get_todos_by_project(&self, project_id: &str) -> Result<Vec<Todo>> {
        Ok(parse_all(
            self.orchestrator.todos_of_project(project_id)?,
            parse_todo,
        ))
    }

    pub fn get_todos_by_area(&self, area_id: &str) -> Result<Vec<Todo>> {
        Ok(parse_all(
            self.orchestrator.todos_of_area(area_id)?,
            parse_todo,
        ))
    }

    /// Get todos carrying a tag. The host exposes no tag filter, so this
    /// fetches all todos and filters client-side.
    pub fn get_todos_by_tag(&self, tag_name: &str) -> Result<Vec<Todo>> {
        let mut todos = self.get_all_todos()?;
        todos.retain(|todo| todo.tags.iter().any(|tag| tag == tag_name));
        Ok(todos)
    }

    // Todo writes

    /// Create a todo and return it as the host now sees it.
    pub fn create_todo(&self, data: &TodoCreate) -> Result<Todo> {
        let output = self.orchestrator.create_todo(data)?;
        let id = output_text(&output)
            .ok_or_else(|| Error::Other("todo creation returned no identifier".to_string()))?;
        self.get_todo(&id)?
            .ok_or_else(|| Error::Other(format!("created todo {id} could not be fetched back")))
    }

    /// Update a todo and return it as the host now sees it.
    pub fn update_todo(&self, todo_id: &str, patch: &TodoPatch) -> Result<Todo> {
        let output = self.orchestrator.update_todo(todo_id, patch)?;
        let returned = output_text(&output).unwrap_or_default();
        if returned != todo_id {
            return Err(Error::Other(format!(
                "todo update confirmed unexpected identifier: {returned}"
            )));
        }
        self.get_todo(todo_id)?
            .ok_or_else(|| Error::Other(format!("updated todo {todo_id} could not be fetched back")))
    }

    pub fn delete_todo(&self, todo_id: &str) -> Result<()> {
        self.orchestrator.delete_todo(todo_id).map(|_| ())
    }

    // Project operations

    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let output = match self.orchestrator.project_properties(project_id) {
            Ok(output) => output,
            Err(ref err) if is_not_found(err, RefKind::Project) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(single_record(output).and_then(|r| parse_project(&r)))
    }

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        Ok(parse_all(self.orchestrator.all_projects()?, parse_project))
    }

    /// Get projects in an area. The host exposes no area filter for
    /// projects, so this filters all projects on the canonical area token.
    pub fn get_projects_by_area(&self, area_id: &str) -> Result<Vec<Project>> {
        let area_ref = format!("area id {area_id}");
        let mut projects = self.get_all_projects()?;
        projects.retain(|project| project.area.as_deref() == Some(area_ref.as_str()));
        Ok(projects)
    }

    pub fn create_project(&self, data: &ProjectCreate) -> Result<Project> {
        let output = self.orchestrator.create_project(data)?;
        let id = output_text(&output)
            .ok_or_else(|| Error::Other("project creation returned no identifier".to_string()))?;
        self.get_project(&id)?
            .ok_or_else(|| Error::Other(format!("created project {id} could not be fetched back")))
    }

    pub fn update_project(&self, project_id: &str, patch: &ProjectPatch) -> Result<Project> {
        let output = self.orchestrator.update_project(project_id, patch)?;
        let returned = output_text(&output).unwrap_or_default();
        if returned != project_id {
            return Err(Error::Other(format!(
                "project update confirmed unexpected identifier: {returned}"
            )));
        }
        self.get_project(project_id)?.ok_or_else(|| {
            Error::Other(format!("updated project {project_id} could not be fetched back"))
        })
    }

    // Area operations

    pub fn get_area(&self, area_id: &str) -> Result<Option<Area>> {
        let output = match self.orchestrator.area_properties(area_id) {
            Ok(output) => output,
            Err(ref err) if is_not_found(err, RefKind::Area) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(single_record(output).and_then(|r| parse_area(&r)))
    }

    pub fn get_all_areas(&self) -> Result<Vec<Area>> {
        Ok(parse_all(self.orchestrator.all_areas()?, parse_area))
    }

    pub fn create_area(&self, data: &AreaCreate) -> Result<Area> {
        let output = self.orchestrator.create_area(data)?;
        let id = output_text(&output)
            .ok_or_else(|| Error::Other("area creation returned no identifier".to_string()))?;
        self.get_area(&id)?
            .ok_or_else(|| Error::Other(format!("created area {id} could not be fetched back")))
    }

    pub fn update_area(&self, area_id: &str, patch: &AreaPatch) -> Result<Area> {
        let output = self.orchestrator.update_area(area_id, patch)?;
        let returned = output_text(&output).unwrap_or_default();
        if returned != area_id {
            return Err(Error::Other(format!(
                "area update confirmed unexpected identifier: {returned}"
            )));
        }
        self.get_area(area_id)?
            .ok_or_else(|| Error::Other(format!("updated area {area_id} could not be fetched back")))
    }

    // Tag operations

    pub fn get_tag(&self, tag_id: &str) -> Result<Option<Tag>> {
        let output = match self.orchestrator.tag_properties(tag_id) {
            Ok(output) => output,
            Err(ref err) if is_not_found(err, RefKind::Tag) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(single_record(output).and_then(|r| parse_tag(&r)))
    }

    pub fn get_all_tags(&self) -> Result<Vec<Tag>> {
        Ok(parse_all(self.orchestrator.all_tags()?, parse_tag))
    }
}

impl Default for ThingsApi {
    fn default() -> Self {
        Self::new()
    }
}

/// True when an execution failure is the host's lookup-failure pattern for
/// this kind of object.
///
/// The match is a substring of natural-language error text and therefore
/// locale/version-fragile; it is centralized here so a future hardening
/// touches one place.
fn is_not_found(err: &Error, kind: RefKind) -> bool {
    match err {
        Error::Execution { stderr, .. } => {
            stderr.contains(&format!("Can't get {} id", kind.keyword()))
        }
        _ => false,
    }
}

/// Extract a single normalized record from parsed output, if any.
fn single_record(output: Output) -> Option<Record> {
    output
        .as_record()
        .filter(|record| !record.is_empty())
        .map(properties::normalize_record)
}

/// Normalize and parse every record in the output. A single record is
/// treated as a one-element list; anything non-record yields nothing.
fn parse_all<T>(output: Output, parse: fn(&Record) -> Option<T>) -> Vec<T> {
    let records = match output {
        Output::Record(record) => vec![record],
        Output::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Output::Record(record) => Some(record),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    records
        .iter()
        .map(properties::normalize_record)
        .filter_map(|record| parse(&record))
        .collect()
}

/// The textual content of a parsed output value, for identifier returns.
fn output_text(output: &Output) -> Option<String> {
    match output {
        Output::Text(s) if !s.is_empty() => Some(s.clone()),
        Output::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a normalized record into a `Todo`. A record without an identifier
/// denotes a non-existent entity and yields `None`.
fn parse_todo(record: &Record) -> Option<Todo> {
    let id = non_empty_text(record, "id")?;

    Some(Todo {
        id,
        name: text_or_default(record, "name"),
        notes: text_or_default(record, "notes"),
        status: record.text("status").and_then(Status::parse),
        due_date: date_field(record, "due_date"),
        deadline: date_field(record, "deadline"),
        start_date: date_field(record, "start_date"),
        creation_date: datetime_field(record, "creation_date"),
        modification_date: datetime_field(record, "modification_date"),
        completion_date: datetime_field(record, "completion_date"),
        cancellation_date: datetime_field(record, "cancellation_date"),
        activation_date: datetime_field(record, "activation_date"),
        tags: tags_field(record),
        project: optional_text(record, "project"),
        area: optional_text(record, "area"),
        contact: optional_text(record, "contact"),
        class_: record.text("class_").and_then(ClassType::parse),
    })
}

fn parse_project(record: &Record) -> Option<Project> {
    let id = non_empty_text(record, "id")?;

    Some(Project {
        id,
        name: text_or_default(record, "name"),
        notes: text_or_default(record, "notes"),
        status: record.text("status").and_then(Status::parse),
        // The host reports a project's deadline under `due date`.
        deadline: date_field(record, "due_date"),
        creation_date: datetime_field(record, "creation_date"),
        modification_date: datetime_field(record, "modification_date"),
        completion_date: datetime_field(record, "completion_date"),
        cancellation_date: datetime_field(record, "cancellation_date"),
        activation_date: datetime_field(record, "activation_date"),
        tags: tags_field(record),
        area: optional_text(record, "area"),
        contact: optional_text(record, "contact"),
        class_: record.text("class_").and_then(ClassType::parse),
    })
}

fn parse_area(record: &Record) -> Option<Area> {
    let id = non_empty_text(record, "id")?;

    Some(Area {
        id,
        name: text_or_default(record, "name"),
        collapsed: match record.get("collapsed") {
            Some(Output::Bool(b)) => Some(*b),
            _ => None,
        },
        tags: tags_field(record),
        class_: record.text("class_").and_then(ClassType::parse),
    })
}

fn parse_tag(record: &Record) -> Option<Tag> {
    let id = non_empty_text(record, "id")?;

    Some(Tag {
        id,
        name: text_or_default(record, "name"),
        parent_tag: optional_text(record, "parent_tag"),
        keyboard_shortcut: optional_text(record, "keyboard_shortcut"),
        class_: record.text("class_").and_then(ClassType::parse),
    })
}

fn non_empty_text(record: &Record, key: &str) -> Option<String> {
    record
        .text(key)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_or_default(record: &Record, key: &str) -> String {
    record.text(key).unwrap_or_default().to_string()
}

fn optional_text(record: &Record, key: &str) -> Option<String> {
    non_empty_text(record, key)
}

fn tags_field(record: &Record) -> Vec<String> {
    match record.get("tag_names") {
        Some(Output::List(items)) => items
            .iter()
            .filter_map(|item| item.as_text())
            .map(str::to_string)
            .collect(),
        Some(Output::Text(joined)) => properties::split_tag_names(joined),
        _ => Vec::new(),
    }
}

fn date_field(record: &Record, key: &str) -> Option<NaiveDate> {
    record.text(key).and_then(parse_host_date)
}

fn datetime_field(record: &Record, key: &str) -> Option<NaiveDateTime> {
    record.text(key).and_then(parse_host_datetime)
}

/// Parse host date text into a datetime, trying the known output formats.
/// Unparseable text degrades to `None` with a warning rather than failing
/// the whole read.
fn parse_host_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    tracing::warn!(text, "failed to parse host date");
    None
}

fn parse_host_date(text: &str) -> Option<NaiveDate> {
    parse_host_datetime(text).map(|dt| dt.date())
}
