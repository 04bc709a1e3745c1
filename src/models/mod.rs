//! Data models for Things 3 entities.
//!
//! This module defines the typed shapes crossing the bridge boundary:
//! - `Todo`, `Project`, `Area`, `Tag` - entities read from the host
//! - `TodoCreate`, `ProjectCreate`, ... - creation requests
//! - `TodoPatch`, `ProjectPatch` - partial updates with tri-state fields
//! - `Field` - the absent / clear / set tri-state itself

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a todo or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Completed,
    Canceled,
}

impl Status {
    /// Parse a host status value. Tolerates the `cancelled` spelling some
    /// host versions emit.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "open" => Some(Status::Open),
            "completed" => Some(Status::Completed),
            "canceled" | "cancelled" => Some(Status::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Open => "open",
            Status::Completed => "completed",
            Status::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// Host object class, as reported in the `class` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassType {
    #[serde(rename = "to do")]
    Todo,
    #[serde(rename = "selected to do")]
    SelectedTodo,
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "area")]
    Area,
    #[serde(rename = "tag")]
    Tag,
}

impl ClassType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "to do" => Some(ClassType::Todo),
            "selected to do" => Some(ClassType::SelectedTodo),
            "project" => Some(ClassType::Project),
            "area" => Some(ClassType::Area),
            "tag" => Some(ClassType::Tag),
            _ => None,
        }
    }
}

/// Tri-state update field: absent (leave unchanged), clear (explicitly
/// remove the current value), or set to a new value.
///
/// Collapsing absent and clear silently corrupts update semantics, so the
/// distinction is carried as its own type rather than nested `Option`s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    /// The field was not provided; leave it unchanged.
    #[default]
    Absent,
    /// The field was explicitly provided as empty; clear it.
    Clear,
    /// Set the field to this value.
    Set(T),
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// The new value, if this field sets one.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// A todo read from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    /// Host-assigned identifier.
    pub id: String,

    pub name: String,

    /// Notes body; empty when the todo has none.
    #[serde(default)]
    pub notes: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_date: Option<NaiveDateTime>,

    /// Ordered tag names.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Canonical project reference token (`project id ABC`), if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Canonical area reference token (`area id XYZ`), if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_: Option<ClassType>,
}

/// A project read from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub notes: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Projects express their due date as a deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_date: Option<NaiveDateTime>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_: Option<ClassType>,
}

/// An area read from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_: Option<ClassType>,
}

/// A tag read from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,

    pub name: String,

    /// Canonical reference to the parent tag, if nested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard_shortcut: Option<String>,

    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_: Option<ClassType>,
}

/// Request shape for creating a todo.
#[derive(Debug, Clone, Default)]
pub struct TodoCreate {
    pub name: String,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    /// Project reference (`project id ABC`) or plain project name.
    pub project: Option<String>,
    /// Area reference (`area id XYZ`) or plain area name.
    pub area: Option<String>,
    /// Scheduling keyword: today, tomorrow, upcoming, anytime, someday.
    pub when: Option<String>,
    pub checklist: Option<Vec<String>>,
}

/// Partial update for a todo. Tri-state fields distinguish "leave
/// unchanged" from "explicitly clear".
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub status: Option<Status>,
    pub due_date: Field<NaiveDate>,
    /// `Some(vec![])` clears all tags.
    pub tags: Option<Vec<String>>,
    pub project: Field<String>,
    pub area: Field<String>,
    pub when: Option<String>,
}

/// Request shape for creating a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectCreate {
    pub name: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub area: Option<String>,
    pub when: Option<String>,
}

/// Partial update for a project.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub status: Option<Status>,
    pub deadline: Field<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub area: Field<String>,
    pub when: Option<String>,
}

/// Request shape for creating an area.
#[derive(Debug, Clone, Default)]
pub struct AreaCreate {
    pub name: String,
}

/// Partial update for an area.
#[derive(Debug, Clone, Default)]
pub struct AreaPatch {
    pub name: Option<String>,
}

/// Request shape for creating a tag.
#[derive(Debug, Clone, Default)]
pub struct TagCreate {
    pub name: String,
    /// Parent tag reference or name, for nested tags.
    pub parent: Option<String>,
}
