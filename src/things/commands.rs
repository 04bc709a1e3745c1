//! Things 3 command generation.
//!
//! Entity-specific generators translate creation requests and patches into
//! ordered AppleScript statement sequences. The ordering encodes host rules:
//! dates and list membership are rejected at construction time, so they are
//! set after `make new`; project membership is write-only via `move`; tags
//! are written as a comma-joined `tag names` string.

use chrono::NaiveDate;

use crate::applescript::{ScriptCommand, ScriptValue};
use crate::models::{
    AreaCreate, AreaPatch, Field, ProjectCreate, ProjectPatch, Status, TagCreate, TodoCreate,
    TodoPatch,
};
use crate::things::reference::{self, ObjectRef, RefKind};

/// Post-creation properties shared between todo create and update.
struct TodoProps<'a> {
    due_date: &'a Field<NaiveDate>,
    tags: Option<&'a [String]>,
    project: &'a Field<String>,
    area: &'a Field<String>,
    when: Option<&'a str>,
    checklist: Option<&'a [String]>,
}

/// Generator for todo commands.
#[derive(Debug, Clone)]
pub struct TodoCommands {
    app: String,
}

impl TodoCommands {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
        }
    }

    /// Build the script for creating a todo.
    ///
    /// Only name, notes, and the tag-name string are safe to pass at
    /// construction; everything else is applied afterwards in a fixed
    /// order, ending with a return of the new identifier.
    pub fn create(&self, data: &TodoCreate) -> ScriptCommand {
        let mut props: Vec<(String, ScriptValue)> = vec![(
            "name".to_string(),
            ScriptValue::Text(data.name.clone()),
        )];
        if let Some(notes) = &data.notes {
            props.push(("notes".to_string(), ScriptValue::Text(notes.clone())));
        }
        if let Some(tags) = &data.tags
            && !tags.is_empty()
        {
            props.push((
                "tag names".to_string(),
                ScriptValue::Text(tags.join(", ")),
            ));
        }

        let mut cmd = ScriptCommand::new().tell(&self.app).statement(format!(
            "set newTodo to make new to do with properties {}",
            ScriptValue::Record(props).to_literal()
        ));

        let due_date = match data.due_date {
            Some(d) => Field::Set(d),
            None => Field::Absent,
        };
        let project = option_to_field(&data.project);
        let area = option_to_field(&data.area);

        cmd = add_todo_properties(
            cmd,
            "newTodo",
            TodoProps {
                due_date: &due_date,
                tags: data.tags.as_deref(),
                project: &project,
                area: &area,
                when: data.when.as_deref(),
                checklist: data.checklist.as_deref(),
            },
        );

        cmd.return_value("id of newTodo")
    }

    /// Build the script for updating an existing todo.
    ///
    /// Basic properties first, then the status transition, then the same
    /// property ordering as creation (minus checklist), then a return of
    /// the unchanged identifier to confirm the target.
    pub fn update(&self, todo_id: &str, patch: &TodoPatch) -> ScriptCommand {
        let target = ObjectRef::by_id(RefKind::Todo, todo_id).target();
        let mut cmd = ScriptCommand::new().tell(&self.app);

        if let Some(name) = &patch.name {
            cmd = cmd.set_property("name", &target, ScriptValue::Text(name.clone()));
        }
        if let Some(notes) = &patch.notes {
            cmd = cmd.set_property("notes", &target, ScriptValue::Text(notes.clone()));
        }
        if let Some(status) = patch.status {
            cmd = add_status_transition(cmd, &target, status);
        }

        cmd = add_todo_properties(
            cmd,
            &target,
            TodoProps {
                due_date: &patch.due_date,
                tags: patch.tags.as_deref(),
                project: &patch.project,
                area: &patch.area,
                when: patch.when.as_deref(),
                checklist: None,
            },
        );

        cmd.return_value(&format!("\"{todo_id}\""))
    }

    /// Build the script for deleting a todo.
    pub fn delete(&self, todo_id: &str) -> ScriptCommand {
        ScriptCommand::new()
            .tell(&self.app)
            .delete(&ObjectRef::by_id(RefKind::Todo, todo_id).target())
            .return_value("\"success\"")
    }
}

/// Generator for project commands.
#[derive(Debug, Clone)]
pub struct ProjectCommands {
    app: String,
}

impl ProjectCommands {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
        }
    }

    pub fn create(&self, data: &ProjectCreate) -> ScriptCommand {
        let mut props: Vec<(String, ScriptValue)> = vec![(
            "name".to_string(),
            ScriptValue::Text(data.name.clone()),
        )];
        if let Some(notes) = &data.notes {
            props.push(("notes".to_string(), ScriptValue::Text(notes.clone())));
        }
        if let Some(tags) = &data.tags
            && !tags.is_empty()
        {
            props.push((
                "tag names".to_string(),
                ScriptValue::Text(tags.join(", ")),
            ));
        }

        let mut cmd = ScriptCommand::new().tell(&self.app).statement(format!(
            "set newProject to make new project with properties {}",
            ScriptValue::Record(props).to_literal()
        ));

        let deadline = match data.deadline {
            Some(d) => Field::Set(d),
            None => Field::Absent,
        };
        let area = option_to_field(&data.area);

        cmd = add_project_properties(
            cmd,
            "newProject",
            &deadline,
            data.tags.as_deref(),
            &area,
            data.when.as_deref(),
        );

        cmd.return_value("id of newProject")
    }

    pub fn update(&self, project_id: &str, patch: &ProjectPatch) -> ScriptCommand {
        let target = ObjectRef::by_id(RefKind::Project, project_id).target();
        let mut cmd = ScriptCommand::new().tell(&self.app);

        if let Some(name) = &patch.name {
            cmd = cmd.set_property("name", &target, ScriptValue::Text(name.clone()));
        }
        if let Some(notes) = &patch.notes {
            cmd = cmd.set_property("notes", &target, ScriptValue::Text(notes.clone()));
        }
        if let Some(status) = patch.status {
            cmd = add_status_transition(cmd, &target, status);
        }

        cmd = add_project_properties(
            cmd,
            &target,
            &patch.deadline,
            patch.tags.as_deref(),
            &patch.area,
            patch.when.as_deref(),
        );

        cmd.return_value(&format!("\"{project_id}\""))
    }
}

/// Generator for area commands.
#[derive(Debug, Clone)]
pub struct AreaCommands {
    app: String,
}

impl AreaCommands {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
        }
    }

    pub fn create(&self, data: &AreaCreate) -> ScriptCommand {
        let props = vec![(
            "name".to_string(),
            ScriptValue::Text(data.name.clone()),
        )];

        ScriptCommand::new()
            .tell(&self.app)
            .statement(format!(
                "set newArea to make new area with properties {}",
                ScriptValue::Record(props).to_literal()
            ))
            .return_value("id of newArea")
    }

    pub fn update(&self, area_id: &str, patch: &AreaPatch) -> ScriptCommand {
        let target = ObjectRef::by_id(RefKind::Area, area_id).target();
        let mut cmd = ScriptCommand::new().tell(&self.app);

        if let Some(name) = &patch.name {
            cmd = cmd.set_property("name", &target, ScriptValue::Text(name.clone()));
        }

        cmd.return_value(&format!("\"{area_id}\""))
    }
}

/// Generator for tag commands.
#[derive(Debug, Clone)]
pub struct TagCommands {
    app: String,
}

impl TagCommands {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
        }
    }

    /// Build the script for creating a tag. Tags are addressed by name, so
    /// the script returns `name of newTag` rather than an identifier.
    pub fn create(&self, data: &TagCreate) -> ScriptCommand {
        let mut props = vec![(
            "name".to_string(),
            ScriptValue::Text(data.name.clone()),
        )];
        if let Some(parent) = &data.parent {
            props.push((
                "parent tag".to_string(),
                ScriptValue::Expr(reference::assignment_target(parent, RefKind::Tag)),
            ));
        }

        ScriptCommand::new()
            .tell(&self.app)
            .statement(format!(
                "set newTag to make new tag with properties {}",
                ScriptValue::Record(props).to_literal()
            ))
            .return_value("name of newTag")
    }
}

fn option_to_field(value: &Option<String>) -> Field<String> {
    match value {
        Some(v) => Field::Set(v.clone()),
        None => Field::Absent,
    }
}

/// One-way status transition. `open` is a no-op: the host reopens items by
/// clearing the completion/cancellation date itself, and rejects writing
/// `missing value` to either property.
fn add_status_transition(cmd: ScriptCommand, target: &str, status: Status) -> ScriptCommand {
    match status {
        Status::Completed => cmd.set_property(
            "completion date",
            target,
            ScriptValue::Expr("(current date)".to_string()),
        ),
        Status::Canceled => cmd.set_property(
            "cancellation date",
            target,
            ScriptValue::Expr("(current date)".to_string()),
        ),
        Status::Open => cmd,
    }
}

/// Append post-creation todo statements in the fixed order: dates, tags,
/// scheduling, project, area, checklist.
fn add_todo_properties(mut cmd: ScriptCommand, target: &str, props: TodoProps) -> ScriptCommand {
    cmd = add_due_date(cmd, target, "due date", props.due_date);
    cmd = add_tag_names(cmd, target, props.tags);
    cmd = add_todo_scheduling(cmd, target, props.when);

    match props.project {
        Field::Set(project) => {
            cmd = cmd.move_to(target, &reference::assignment_target(project, RefKind::Project));
        }
        // Removing from a project means moving back to the inbox.
        Field::Clear => cmd = cmd.move_to(target, "list \"Inbox\""),
        Field::Absent => {}
    }

    match props.area {
        Field::Set(area) => {
            cmd = cmd.set_property(
                "area",
                target,
                ScriptValue::Expr(reference::assignment_target(area, RefKind::Area)),
            );
        }
        Field::Clear => cmd = cmd.set_property("area", target, ScriptValue::Missing),
        Field::Absent => {}
    }

    if let Some(checklist) = props.checklist {
        for item in checklist {
            cmd = cmd.statement(format!(
                "tell {target} to make new checklist item with properties {{name:{}}}",
                ScriptValue::Text(item.clone()).to_literal()
            ));
        }
    }

    cmd
}

/// Append post-creation project statements: deadline, tags, scheduling,
/// area.
fn add_project_properties(
    mut cmd: ScriptCommand,
    target: &str,
    deadline: &Field<NaiveDate>,
    tags: Option<&[String]>,
    area: &Field<String>,
    when: Option<&str>,
) -> ScriptCommand {
    cmd = add_due_date(cmd, target, "deadline", deadline);
    cmd = add_tag_names(cmd, target, tags);

    if let Some(when) = when {
        let keyword = when.to_lowercase();
        if keyword == "anytime" || keyword == "someday" {
            cmd = cmd.move_to(target, &format!("list \"{}\"", capitalize(&keyword)));
        }
    }

    match area {
        Field::Set(area) => {
            cmd = cmd.set_property(
                "area",
                target,
                ScriptValue::Expr(reference::assignment_target(area, RefKind::Area)),
            );
        }
        Field::Clear => cmd = cmd.set_property("area", target, ScriptValue::Missing),
        Field::Absent => {}
    }

    cmd
}

/// The date tri-state: set emits one set statement, clear emits one
/// delete-property statement, absent emits nothing.
fn add_due_date(
    cmd: ScriptCommand,
    target: &str,
    property: &str,
    date: &Field<NaiveDate>,
) -> ScriptCommand {
    match date {
        Field::Set(d) => cmd.set_property(property, target, ScriptValue::Date(*d)),
        Field::Clear => cmd.delete(&format!("{property} of {target}")),
        Field::Absent => cmd,
    }
}

fn add_tag_names(cmd: ScriptCommand, target: &str, tags: Option<&[String]>) -> ScriptCommand {
    match tags {
        Some(tags) if !tags.is_empty() => {
            cmd.set_property("tag names", target, ScriptValue::Text(tags.join(", ")))
        }
        // An explicit empty list clears all tags.
        Some(_) => cmd.set_property("tag names", target, ScriptValue::Text(String::new())),
        None => cmd,
    }
}

fn add_todo_scheduling(cmd: ScriptCommand, target: &str, when: Option<&str>) -> ScriptCommand {
    let Some(when) = when else {
        return cmd;
    };

    match when.to_lowercase().as_str() {
        // The host has no direct "tomorrow" container; schedule into Today
        // with a due date one day out.
        "tomorrow" => cmd
            .move_to(target, "list \"Today\"")
            .set_property(
                "due date",
                target,
                ScriptValue::Expr("(current date) + (1 * days)".to_string()),
            ),
        keyword @ ("today" | "upcoming" | "anytime" | "someday") => {
            cmd.move_to(target, &format!("list \"{}\"", capitalize(keyword)))
        }
        _ => cmd,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn build(cmd: ScriptCommand) -> String {
        cmd.build().unwrap()
    }

    #[test]
    fn test_create_todo_minimal() {
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "Buy milk".to_string(),
            ..Default::default()
        }));
        assert!(script.starts_with("tell application \"Things3\""));
        assert!(script.contains(
            "set newTodo to make new to do with properties {name:\"Buy milk\"}"
        ));
        assert!(script.contains("return id of newTodo"));
        assert!(script.ends_with("end tell"));
    }

    #[test]
    fn test_create_todo_end_to_end_scenario() {
        // Name, tags, and scheduling for today: the creation record carries
        // name and tag names, then the todo moves to the Today container,
        // then the new identifier is returned.
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "Buy milk".to_string(),
            tags: Some(vec!["errand".to_string()]),
            when: Some("today".to_string()),
            ..Default::default()
        }));

        assert!(script.contains(
            "make new to do with properties {name:\"Buy milk\", tag names:\"errand\"}"
        ));
        assert!(script.contains("move newTodo to list \"Today\""));
        assert!(script.contains("return id of newTodo"));

        let make_pos = script.find("make new to do").unwrap();
        let move_pos = script.find("move newTodo").unwrap();
        let return_pos = script.find("return id").unwrap();
        assert!(make_pos < move_pos && move_pos < return_pos);
    }

    #[test]
    fn test_create_todo_escapes_name() {
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "Review: \"Q3 plan\"".to_string(),
            ..Default::default()
        }));
        assert!(script.contains(r#"{name:"Review: \"Q3 plan\""}"#));
    }

    #[test]
    fn test_create_todo_name_with_reference_prefix_stays_quoted() {
        // A todo literally named like a reference must not be emitted as an
        // unquoted expression.
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "list of things".to_string(),
            ..Default::default()
        }));
        assert!(script.contains("{name:\"list of things\"}"));
    }

    #[test]
    fn test_create_todo_due_date_uses_date_arithmetic() {
        let due = Local::now().date_naive() + Duration::days(10);
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "x".to_string(),
            due_date: Some(due),
            ..Default::default()
        }));
        assert!(script.contains(
            "set due date of newTodo to (current date) + (10 * days)"
        ));
    }

    #[test]
    fn test_create_todo_checklist_items() {
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "Pack".to_string(),
            checklist: Some(vec!["passport".to_string(), "charger".to_string()]),
            ..Default::default()
        }));
        assert!(script.contains(
            "tell newTodo to make new checklist item with properties {name:\"passport\"}"
        ));
        assert!(script.contains(
            "tell newTodo to make new checklist item with properties {name:\"charger\"}"
        ));
    }

    #[test]
    fn test_create_todo_project_by_id_reference() {
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "x".to_string(),
            project: Some("project id \"ABC\"".to_string()),
            ..Default::default()
        }));
        assert!(script.contains("move newTodo to project id \"ABC\""));
    }

    #[test]
    fn test_create_todo_project_by_name() {
        let script = build(TodoCommands::new("Things3").create(&TodoCreate {
            name: "x".to_string(),
            project: Some("Work".to_string()),
            ..Default::default()
        }));
        assert!(script.contains("move newTodo to project \"Work\""));
    }

    #[test]
    fn test_update_todo_due_date_tri_state() {
        let todo = TodoCommands::new("Things3");

        // Absent: no date statements at all.
        let script = build(todo.update("abc", &TodoPatch::default()));
        assert!(!script.contains("due date"));

        // Clear: exactly one delete-property statement.
        let script = build(todo.update(
            "abc",
            &TodoPatch {
                due_date: Field::Clear,
                ..Default::default()
            },
        ));
        assert_eq!(
            script
                .matches("delete due date of to do id \"abc\"")
                .count(),
            1
        );
        assert!(!script.contains("set due date"));

        // Set: exactly one set statement with the date expression.
        let due = Local::now().date_naive() + Duration::days(1);
        let script = build(todo.update(
            "abc",
            &TodoPatch {
                due_date: Field::Set(due),
                ..Default::default()
            },
        ));
        assert_eq!(
            script
                .matches(
                    "set due date of to do id \"abc\" to (current date) + (1 * days)"
                )
                .count(),
            1
        );
        assert!(!script.contains("delete due date"));
    }

    #[test]
    fn test_update_todo_clear_project_moves_to_inbox() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                project: Field::Clear,
                ..Default::default()
            },
        ));
        assert!(script.contains("move to do id \"abc\" to list \"Inbox\""));
    }

    #[test]
    fn test_update_todo_clear_area_sets_missing_value() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                area: Field::Clear,
                ..Default::default()
            },
        ));
        assert!(script.contains("set area of to do id \"abc\" to missing value"));
    }

    #[test]
    fn test_update_todo_area_by_id_not_requoted() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                area: Field::Set("area id \"XYZ\"".to_string()),
                ..Default::default()
            },
        ));
        assert!(script.contains("set area of to do id \"abc\" to area id \"XYZ\""));
    }

    #[test]
    fn test_update_todo_status_completed() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                status: Some(Status::Completed),
                ..Default::default()
            },
        ));
        assert!(script.contains(
            "set completion date of to do id \"abc\" to (current date)"
        ));
    }

    #[test]
    fn test_update_todo_status_canceled() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                status: Some(Status::Canceled),
                ..Default::default()
            },
        ));
        assert!(script.contains(
            "set cancellation date of to do id \"abc\" to (current date)"
        ));
    }

    #[test]
    fn test_update_todo_status_open_is_noop() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                status: Some(Status::Open),
                ..Default::default()
            },
        ));
        assert!(!script.contains("completion date"));
        assert!(!script.contains("cancellation date"));
    }

    #[test]
    fn test_update_todo_clear_tags() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                tags: Some(vec![]),
                ..Default::default()
            },
        ));
        assert!(script.contains("set tag names of to do id \"abc\" to \"\""));
    }

    #[test]
    fn test_update_todo_returns_quoted_id() {
        let script = build(TodoCommands::new("Things3").update("abc", &TodoPatch::default()));
        assert!(script.contains("return \"abc\""));
    }

    #[test]
    fn test_update_todo_scheduling_tomorrow() {
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                when: Some("tomorrow".to_string()),
                ..Default::default()
            },
        ));
        assert!(script.contains("move to do id \"abc\" to list \"Today\""));
        assert!(script.contains(
            "set due date of to do id \"abc\" to (current date) + (1 * days)"
        ));
    }

    #[test]
    fn test_delete_todo() {
        let script = build(TodoCommands::new("Things3").delete("abc"));
        assert!(script.contains("delete to do id \"abc\""));
        assert!(script.contains("return \"success\""));
    }

    #[test]
    fn test_create_project_with_deadline_and_area() {
        let deadline = Local::now().date_naive() + Duration::days(3);
        let script = build(ProjectCommands::new("Things3").create(&ProjectCreate {
            name: "Launch".to_string(),
            deadline: Some(deadline),
            area: Some("area id \"XYZ\"".to_string()),
            ..Default::default()
        }));
        assert!(script.contains(
            "set newProject to make new project with properties {name:\"Launch\"}"
        ));
        assert!(script.contains(
            "set deadline of newProject to (current date) + (3 * days)"
        ));
        assert!(script.contains("set area of newProject to area id \"XYZ\""));
        assert!(script.contains("return id of newProject"));
    }

    #[test]
    fn test_update_project_clear_deadline() {
        let script = build(ProjectCommands::new("Things3").update(
            "P1",
            &ProjectPatch {
                deadline: Field::Clear,
                ..Default::default()
            },
        ));
        assert!(script.contains("delete deadline of project id \"P1\""));
        assert!(script.contains("return \"P1\""));
    }

    #[test]
    fn test_project_scheduling_limited_to_anytime_someday() {
        let projects = ProjectCommands::new("Things3");

        let script = build(projects.update(
            "P1",
            &ProjectPatch {
                when: Some("someday".to_string()),
                ..Default::default()
            },
        ));
        assert!(script.contains("move project id \"P1\" to list \"Someday\""));

        // "today" is not a project container; nothing is emitted.
        let script = build(projects.update(
            "P1",
            &ProjectPatch {
                when: Some("today".to_string()),
                ..Default::default()
            },
        ));
        assert!(!script.contains("move project id \"P1\""));
    }

    #[test]
    fn test_create_area() {
        let script = build(AreaCommands::new("Things3").create(&AreaCreate {
            name: "Home".to_string(),
        }));
        assert!(script.contains(
            "set newArea to make new area with properties {name:\"Home\"}"
        ));
        assert!(script.contains("return id of newArea"));
    }

    #[test]
    fn test_update_area_rename() {
        let script = build(AreaCommands::new("Things3").update(
            "A1",
            &AreaPatch {
                name: Some("Office".to_string()),
            },
        ));
        assert!(script.contains("set name of area id \"A1\" to \"Office\""));
        assert!(script.contains("return \"A1\""));
    }

    #[test]
    fn test_create_tag_returns_name() {
        let script = build(TagCommands::new("Things3").create(&TagCreate {
            name: "errand".to_string(),
            parent: None,
        }));
        assert!(script.contains(
            "set newTag to make new tag with properties {name:\"errand\"}"
        ));
        assert!(script.contains("return name of newTag"));
    }

    #[test]
    fn test_create_tag_with_parent() {
        let script = build(TagCommands::new("Things3").create(&TagCreate {
            name: "groceries".to_string(),
            parent: Some("errand".to_string()),
        }));
        assert!(script.contains(
            "make new tag with properties {name:\"groceries\", parent tag:tag \"errand\"}"
        ));
    }

    #[test]
    fn test_property_ordering_dates_before_tags_before_when() {
        let due = Local::now().date_naive() + Duration::days(2);
        let script = build(TodoCommands::new("Things3").update(
            "abc",
            &TodoPatch {
                due_date: Field::Set(due),
                tags: Some(vec!["a".to_string()]),
                when: Some("anytime".to_string()),
                project: Field::Set("Work".to_string()),
                area: Field::Set("Home".to_string()),
                ..Default::default()
            },
        ));

        let date_pos = script.find("set due date").unwrap();
        let tags_pos = script.find("set tag names").unwrap();
        let when_pos = script.find("move to do id \"abc\" to list \"Anytime\"").unwrap();
        let project_pos = script.find("move to do id \"abc\" to project \"Work\"").unwrap();
        let area_pos = script.find("set area").unwrap();

        assert!(date_pos < tags_pos);
        assert!(tags_pos < when_pos);
        assert!(when_pos < project_pos);
        assert!(project_pos < area_pos);
    }
}
