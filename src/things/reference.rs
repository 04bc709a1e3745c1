//! Things 3 object references.
//!
//! The host addresses objects as `project id "ABC"` or `area "Work"`, and
//! echoes them back with a qualifying suffix (`project id "ABC" of
//! application "Things3"`). Callers see the canonical short token instead:
//! `project id ABC` / `area Work`. Canonical tokens round-trip through
//! parse/format.

use std::fmt;

/// The kinds of objects a reference can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Todo,
    Project,
    Area,
    Tag,
    List,
}

impl RefKind {
    /// The AppleScript keyword for this kind. `Todo` is spelled `to do`.
    pub fn keyword(&self) -> &'static str {
        match self {
            RefKind::Todo => "to do",
            RefKind::Project => "project",
            RefKind::Area => "area",
            RefKind::Tag => "tag",
            RefKind::List => "list",
        }
    }

    /// All kinds, longest keyword first so prefix matching is unambiguous.
    fn all() -> &'static [RefKind] {
        &[
            RefKind::Todo,
            RefKind::Project,
            RefKind::Area,
            RefKind::Tag,
            RefKind::List,
        ]
    }
}

/// A reference to a host object, by identifier or by human name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    ById { kind: RefKind, id: String },
    ByName { kind: RefKind, name: String },
}

impl ObjectRef {
    pub fn by_id(kind: RefKind, id: impl Into<String>) -> Self {
        ObjectRef::ById {
            kind,
            id: id.into(),
        }
    }

    pub fn by_name(kind: RefKind, name: impl Into<String>) -> Self {
        ObjectRef::ByName {
            kind,
            name: name.into(),
        }
    }

    /// Parse a reference from either the canonical short form
    /// (`project id ABC`, `tag Work`) or the raw host form
    /// (`project id "ABC" of application "Things3"`).
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();

        // Strip the qualifying suffix the host appends to echoed references.
        let input = match input.split_once(" of application ") {
            Some((head, _)) => head,
            None => input,
        };

        for kind in RefKind::all() {
            let keyword = kind.keyword();

            if let Some(rest) = input.strip_prefix(keyword) {
                if let Some(id) = rest.strip_prefix(" id ") {
                    let id = strip_quotes(id);
                    if !id.is_empty() {
                        return Some(ObjectRef::by_id(*kind, id));
                    }
                } else if let Some(name) = rest.strip_prefix(' ') {
                    let name = strip_quotes(name);
                    if !name.is_empty() {
                        return Some(ObjectRef::by_name(*kind, name));
                    }
                }
            }
        }

        None
    }

    /// The canonical short token: `project id ABC` / `tag Work`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// The AppleScript target expression: `project id "ABC"` / `tag "Work"`.
    pub fn target(&self) -> String {
        match self {
            ObjectRef::ById { kind, id } => format!("{} id \"{}\"", kind.keyword(), id),
            ObjectRef::ByName { kind, name } => format!("{} \"{}\"", kind.keyword(), name),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::ById { kind, id } => write!(f, "{} id {}", kind.keyword(), id),
            ObjectRef::ByName { kind, name } => write!(f, "{} {}", kind.keyword(), name),
        }
    }
}

/// Resolve a caller-supplied assignment value into an AppleScript target.
///
/// A value already carrying a reference prefix (`project id "ABC"`) is used
/// verbatim; anything else is treated as a human name and quoted under the
/// given kind (`project "Work"`).
pub fn assignment_target(input: &str, kind: RefKind) -> String {
    if crate::applescript::value::is_expression(input) {
        input.to_string()
    } else {
        ObjectRef::by_name(kind, input).target()
    }
}

/// Canonicalize a raw host reference (`project id "ABC" of application
/// "Things3"`) to its short token. Returns `None` for values without the
/// qualifying suffix, so ordinary text fields are never rewritten.
pub fn canonicalize_raw(value: &str) -> Option<String> {
    if !value.contains(" of application ") {
        return None;
    }
    ObjectRef::parse(value).map(|r| r.canonical())
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
