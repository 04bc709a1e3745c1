//! AppleScript command generation.
//!
//! This module provides a builder for assembling AppleScript source text.
//! It does not execute scripts, only generates the string representations.

use crate::applescript::value::ScriptValue;
use crate::{Error, Result};

/// Builder for assembling an AppleScript from individual statements.
///
/// Statements are collected in order and joined at build time, optionally
/// wrapped in a `tell application` block. A raw override set via [`raw`]
/// bypasses the collected statements entirely.
///
/// [`raw`]: ScriptCommand::raw
#[derive(Debug, Clone, Default)]
pub struct ScriptCommand {
    tell_app: Option<String>,
    statements: Vec<String>,
    raw_script: Option<String>,
}

impl ScriptCommand {
    /// Create an empty command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application the script talks to.
    ///
    /// # Example
    /// ```
    /// use things_mcp::applescript::ScriptCommand;
    /// let script = ScriptCommand::new()
    ///     .tell("Things3")
    ///     .statement("activate")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(script, "tell application \"Things3\"\n    activate\nend tell");
    /// ```
    pub fn tell(mut self, application: &str) -> Self {
        self.tell_app = Some(application.to_string());
        self
    }

    /// Append a raw statement.
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }

    /// Append `set <property> of <target> to <value>`.
    ///
    /// The value is rendered through [`ScriptValue`]; strings recognized as
    /// expressions (object references, date arithmetic) pass through
    /// unquoted via the `From<&str>` conversion.
    pub fn set_property(mut self, property: &str, of: &str, to: impl Into<ScriptValue>) -> Self {
        let value = to.into().to_literal();
        self.statements
            .push(format!("set {property} of {of} to {value}"));
        self
    }

    /// Append `get <property>` with an optional `of <target>` qualifier.
    pub fn get_property(mut self, property: &str, of: Option<&str>) -> Self {
        match of {
            Some(target) => self
                .statements
                .push(format!("get {property} of {target}")),
            None => self.statements.push(format!("get {property}")),
        }
        self
    }

    /// Append `make new <class>` with optional properties and location.
    pub fn make_new(
        mut self,
        class_name: &str,
        with_properties: Option<&[(String, ScriptValue)]>,
        at: Option<&str>,
    ) -> Self {
        let mut statement = format!("make new {class_name}");

        if let Some(properties) = with_properties {
            let record = ScriptValue::Record(properties.to_vec());
            statement.push_str(&format!(" with properties {}", record.to_literal()));
        }

        if let Some(location) = at {
            statement.push_str(&format!(" at {location}"));
        }

        self.statements.push(statement);
        self
    }

    /// Append `delete <target>`.
    pub fn delete(mut self, target: &str) -> Self {
        self.statements.push(format!("delete {target}"));
        self
    }

    /// Append `move <target> to <destination>`.
    pub fn move_to(mut self, target: &str, destination: &str) -> Self {
        self.statements
            .push(format!("move {target} to {destination}"));
        self
    }

    /// Append `return <expression>`.
    pub fn return_value(mut self, expression: &str) -> Self {
        self.statements.push(format!("return {expression}"));
        self
    }

    /// Set a raw script that bypasses all collected statements.
    pub fn raw(mut self, script: &str) -> Self {
        self.raw_script = Some(script.to_string());
        self
    }

    /// Build the final script text.
    ///
    /// Building is read-only: calling it twice yields identical text. A
    /// command with no statements and no raw override fails with
    /// [`Error::EmptyCommand`] rather than producing an empty script.
    pub fn build(&self) -> Result<String> {
        if let Some(raw) = &self.raw_script {
            return Ok(raw.clone());
        }

        if self.statements.is_empty() {
            return Err(Error::EmptyCommand);
        }

        let body = self.statements.join("\n    ");
        match &self.tell_app {
            Some(app) => Ok(format!(
                "tell application \"{app}\"\n    {body}\nend tell"
            )),
            None => Ok(self.statements.join("\n")),
        }
    }
}
