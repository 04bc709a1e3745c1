//! Rendering values into AppleScript literal syntax.
//!
//! `ScriptValue` is a closed sum over everything the bridge ever writes into
//! a script: adding a new kind is a compile-time-checked change to
//! `to_literal`, not a runtime type-inspection chain.

use chrono::{Local, NaiveDate};

/// Reference prefixes that mark a string as a pre-built object reference.
///
/// Longer forms come first so `project id ` wins over `project `.
pub const REFERENCE_PREFIXES: &[&str] = &[
    "area id ",
    "project id ",
    "tag id ",
    "to do id ",
    "area ",
    "project ",
    "tag ",
    "list ",
];

/// A value renderable as an AppleScript literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// The `missing value` token.
    Missing,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Plain text, quoted and escaped on output.
    Text(String),
    /// A calendar date, rendered as a relative `current date` expression.
    Date(NaiveDate),
    /// An ordered list, `{a, b, ...}`.
    List(Vec<ScriptValue>),
    /// A record, `{key:value, ...}` with unquoted keys. Order is preserved.
    Record(Vec<(String, ScriptValue)>),
    /// A pre-built AppleScript expression, emitted verbatim.
    Expr(String),
}

impl ScriptValue {
    /// Build a value from text, treating recognized AppleScript expressions
    /// (object references, date arithmetic, special tokens) as `Expr` so they
    /// are not re-quoted.
    ///
    /// Known limitation: the detection is a prefix heuristic. A literal
    /// string that happens to start with a reference prefix (a todo named
    /// `list of things`) is misclassified as an expression. Callers that
    /// need such a literal should construct `ScriptValue::Text` directly.
    pub fn from_text(s: &str) -> Self {
        if is_expression(s) {
            ScriptValue::Expr(s.to_string())
        } else {
            ScriptValue::Text(s.to_string())
        }
    }

    /// Render this value as AppleScript literal text.
    pub fn to_literal(&self) -> String {
        match self {
            ScriptValue::Missing => "missing value".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Int(n) => n.to_string(),
            ScriptValue::Real(x) => x.to_string(),
            ScriptValue::Text(s) => quote(s),
            ScriptValue::Date(d) => date_expression(*d),
            ScriptValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_literal()).collect();
                format!("{{{}}}", rendered.join(", "))
            }
            ScriptValue::Record(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(key, value)| format!("{}:{}", key, value.to_literal()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            ScriptValue::Expr(expr) => expr.clone(),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::from_text(s)
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::from_text(&s)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<i64> for ScriptValue {
    fn from(n: i64) -> Self {
        ScriptValue::Int(n)
    }
}

impl From<f64> for ScriptValue {
    fn from(x: f64) -> Self {
        ScriptValue::Real(x)
    }
}

impl From<NaiveDate> for ScriptValue {
    fn from(d: NaiveDate) -> Self {
        ScriptValue::Date(d)
    }
}

/// Check whether a string is an AppleScript expression that must not be
/// quoted: date keywords, `current date` arithmetic, object references, and
/// the special literal tokens.
pub fn is_expression(s: &str) -> bool {
    let s = s.trim();

    if s == "current date" || s == "(current date)" {
        return true;
    }
    if s.starts_with("(current date)") && (s.contains('+') || s.contains('-')) && s.contains("days")
    {
        return true;
    }
    if REFERENCE_PREFIXES.iter().any(|prefix| s.starts_with(prefix)) {
        return true;
    }

    matches!(s, "missing value" | "true" | "false")
}

/// Quote a string for AppleScript, escaping embedded quotes.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Render a date as a relative expression against today's wall-clock date.
fn date_expression(target: NaiveDate) -> String {
    let today = Local::now().date_naive();
    let days = (target - today).num_days();

    match days {
        0 => "current date".to_string(),
        1 => "(current date) + (1 * days)".to_string(),
        -1 => "(current date) - (1 * days)".to_string(),
        n if n > 0 => format!("(current date) + ({n} * days)"),
        n => format!("(current date) - ({} * days)", -n),
    }
}
