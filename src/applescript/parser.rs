//! Parsers for AppleScript output formats.
//!
//! osascript output is not one grammar: depending on the script and the
//! serialization flags it may be JSON, a `{key:value, ...}` record with
//! unquoted keys, a doubled-brace record list, a bare `date "..."`, a plain
//! `{a, b, c}` list, or a primitive. Each format gets its own strategy with
//! an applicability predicate; the first matching strategy owns the text.
//! A strategy that matches but fails to decode raises a parse error rather
//! than falling through, so malformed output is never silently hidden.

use crate::applescript::scan;
use crate::{Error, Result, truncate_for_diagnostics};

/// Maximum raw-output bytes carried inside a parse error.
const ERROR_OUTPUT_LIMIT: usize = 200;

/// A parsed AppleScript output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    List(Vec<Output>),
    Record(Record),
}

impl Output {
    /// Text content, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Output::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Record content, if this value is a record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Output::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Output::Null)
    }
}

/// A record of key/value fields with preserved field order.
///
/// Host output reflects document order (list position and the like), so the
/// order fields arrived in is significant and kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Output)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. `get` returns the first match; the host does not
    /// emit duplicate keys.
    pub fn insert(&mut self, key: impl Into<String>, value: Output) {
        self.fields.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Output> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Text content of a field, if present and textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Output::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Output)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Output)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Output)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A single output-format parser: an applicability predicate plus a decode
/// routine. The chain consults `can_parse` before ever calling `parse`.
pub trait ParserStrategy {
    fn name(&self) -> &'static str;
    fn can_parse(&self, raw: &str) -> bool;
    fn parse(&self, raw: &str) -> Result<Output>;
}

fn parse_error(parser: &'static str, raw: &str, detail: impl Into<String>) -> Error {
    Error::Parse {
        parser,
        detail: detail.into(),
        output: truncate_for_diagnostics(raw, ERROR_OUTPUT_LIMIT),
    }
}

/// Strict JSON output, produced by scripts that assemble JSON themselves.
pub struct JsonParser;

impl ParserStrategy for JsonParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn can_parse(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            return true;
        }

        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            // A JSON object is `{}` or has a quoted key before its first
            // colon. A colon before the first quote means unquoted keys
            // (the AppleScript record format); no colon at all means an
            // AppleScript list.
            let Some(colon) = trimmed.find(':') else {
                return trimmed[1..trimmed.len() - 1].trim().is_empty();
            };
            return match trimmed.find('"') {
                Some(quote) => quote < colon,
                None => false,
            };
        }

        false
    }

    fn parse(&self, raw: &str) -> Result<Output> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| parse_error(self.name(), raw, e.to_string()))?;
        Ok(json_to_output(value))
    }
}

fn json_to_output(value: serde_json::Value) -> Output {
    match value {
        serde_json::Value::Null => Output::Null,
        serde_json::Value::Bool(b) => Output::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Output::Int(i)
            } else {
                Output::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Output::Text(s),
        serde_json::Value::Array(items) => {
            Output::List(items.into_iter().map(json_to_output).collect())
        }
        serde_json::Value::Object(map) => Output::Record(
            map.into_iter()
                .map(|(k, v)| (k, json_to_output(v)))
                .collect(),
        ),
    }
}

/// AppleScript structured records: `{key:value, ...}` or a doubled-brace
/// list `{{...}, {...}}` as produced under the `-s s` flag.
pub struct RecordParser;

impl ParserStrategy for RecordParser {
    fn name(&self) -> &'static str {
        "record"
    }

    fn can_parse(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }

        // The doubled-brace case must be checked first: a record list is
        // unambiguous even when each element is itself record-shaped.
        (trimmed.starts_with("{{") && trimmed.ends_with("}}"))
            || (trimmed.starts_with('{') && trimmed.contains(':') && trimmed.ends_with('}'))
    }

    fn parse(&self, raw: &str) -> Result<Output> {
        let trimmed = raw.trim();

        if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
            self.parse_record_list(raw, trimmed)
        } else {
            Ok(Output::Record(self.parse_single_record(raw, trimmed)?))
        }
    }
}

impl RecordParser {
    /// Parse `{{...}, {...}}` into an ordered list of records.
    ///
    /// Stripping one outer brace pair leaves a comma-separated sequence of
    /// brace-wrapped records; the top-level split re-uses the same
    /// quote/escape/depth tracking as pair splitting.
    fn parse_record_list(&self, raw: &str, trimmed: &str) -> Result<Output> {
        let inner = &trimmed[1..trimmed.len() - 1];

        let mut records = Vec::new();
        for fragment in scan::split_top_level(inner, ',') {
            if fragment.is_empty() {
                continue;
            }
            let wrapped;
            let fragment = if fragment.starts_with('{') {
                fragment.as_str()
            } else {
                wrapped = format!("{{{fragment}}}");
                &wrapped
            };
            records.push(Output::Record(self.parse_single_record(raw, fragment)?));
        }

        Ok(Output::List(records))
    }

    fn parse_single_record(&self, raw: &str, fragment: &str) -> Result<Record> {
        let fragment = fragment.trim();
        if !fragment.starts_with('{') || !fragment.ends_with('}') || fragment.len() < 2 {
            return Err(parse_error(
                self.name(),
                raw,
                format!("not a record: {}", truncate_for_diagnostics(fragment, 50)),
            ));
        }

        let content = &fragment[1..fragment.len() - 1];
        let mut record = Record::new();

        for pair in scan::split_top_level(content, ',') {
            if pair.is_empty() {
                continue;
            }
            // Pairs without a separator are skipped rather than failing the
            // whole record; the host occasionally emits stray fragments.
            let Some(colon) = scan::find_separator(&pair) else {
                continue;
            };
            let key = pair[..colon].trim();
            let value = self.parse_value(raw, pair[colon + 1..].trim())?;
            if !key.is_empty() {
                record.insert(key, value);
            }
        }

        Ok(record)
    }

    fn parse_value(&self, raw: &str, value: &str) -> Result<Output> {
        if value == "missing value" {
            return Ok(Output::Null);
        }

        if value.eq_ignore_ascii_case("true") {
            return Ok(Output::Bool(true));
        }
        if value.eq_ignore_ascii_case("false") {
            return Ok(Output::Bool(false));
        }

        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            return Ok(Output::Text(unescape(&value[1..value.len() - 1])));
        }

        // `date "..."` - the closing quote is sometimes missing in host
        // output, so tolerate its absence.
        if let Some(rest) = value.strip_prefix("date \"") {
            let text = rest.strip_suffix('"').unwrap_or(rest);
            return Ok(Output::Text(text.to_string()));
        }

        // Nested structures inside a field value.
        if value.starts_with("{{") && value.ends_with("}}") {
            return self.parse_record_list(raw, value);
        }
        if value.starts_with('{') && value.ends_with('}') {
            if scan::find_separator(&value[1..value.len() - 1]).is_some() {
                return Ok(Output::Record(self.parse_single_record(raw, value)?));
            }
            let items = scan::split_top_level(&value[1..value.len() - 1], ',')
                .iter()
                .map(|item| self.parse_value(raw, item))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Output::List(items));
        }

        if value.contains('.') {
            if let Ok(x) = value.parse::<f64>() {
                return Ok(Output::Real(x));
            }
        } else if let Ok(n) = value.parse::<i64>() {
            return Ok(Output::Int(n));
        }

        // Anything else passes through untouched (object references,
        // unquoted identifiers such as status values).
        Ok(Output::Text(value.to_string()))
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// A bare `date "..."` output.
pub struct DateParser;

impl ParserStrategy for DateParser {
    fn name(&self) -> &'static str {
        "date"
    }

    fn can_parse(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.starts_with("date \"") && trimmed.ends_with('"') && trimmed.len() > "date \"\"".len()
    }

    fn parse(&self, raw: &str) -> Result<Output> {
        let trimmed = raw.trim();
        let inner = trimmed
            .strip_prefix("date \"")
            .and_then(|rest| rest.strip_suffix('"'))
            .filter(|inner| !inner.is_empty())
            .ok_or_else(|| parse_error(self.name(), raw, "malformed date literal"))?;
        Ok(Output::Text(inner.to_string()))
    }
}

/// A plain `{a, b, c}` list with no record keys.
pub struct ListParser;

impl ParserStrategy for ListParser {
    fn name(&self) -> &'static str {
        "list"
    }

    fn can_parse(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.starts_with('{')
            && trimmed.ends_with('}')
            && !trimmed.contains(':')
            && !trimmed.starts_with("{{")
    }

    fn parse(&self, raw: &str) -> Result<Output> {
        let trimmed = raw.trim();
        let content = &trimmed[1..trimmed.len() - 1];

        if content.trim().is_empty() {
            return Ok(Output::List(Vec::new()));
        }

        let items = scan::split_top_level(content, ',')
            .into_iter()
            .map(|item| {
                if item.len() >= 2 && item.starts_with('"') && item.ends_with('"') {
                    Output::Text(unescape(&item[1..item.len() - 1]))
                } else {
                    Output::Text(item)
                }
            })
            .collect();

        Ok(Output::List(items))
    }
}

/// Mandatory fallback: primitives and bare text.
pub struct PrimitiveParser;

impl ParserStrategy for PrimitiveParser {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn can_parse(&self, _raw: &str) -> bool {
        true
    }

    fn parse(&self, raw: &str) -> Result<Output> {
        if raw.is_empty() {
            return Ok(Output::Null);
        }

        let value = raw.trim();

        // All-whitespace output is returned untouched; callers depend on
        // seeing it as-is rather than collapsed to empty.
        if value.is_empty() {
            return Ok(Output::Text(raw.to_string()));
        }

        if value == "missing value" {
            return Ok(Output::Null);
        }

        if value.eq_ignore_ascii_case("true") {
            return Ok(Output::Bool(true));
        }
        if value.eq_ignore_ascii_case("false") {
            return Ok(Output::Bool(false));
        }

        if value.contains('.') {
            if let Ok(x) = value.parse::<f64>() {
                return Ok(Output::Real(x));
            }
        } else if let Ok(n) = value.parse::<i64>() {
            return Ok(Output::Int(n));
        }

        Ok(Output::Text(value.to_string()))
    }
}

/// Ordered chain of parser strategies; the first whose predicate matches
/// consumes the output.
pub struct ParserChain {
    parsers: Vec<Box<dyn ParserStrategy + Send + Sync>>,
}

impl ParserChain {
    /// The default chain: JSON, structured records, bare dates, plain lists,
    /// then the primitive fallback.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(JsonParser),
                Box::new(RecordParser),
                Box::new(DateParser),
                Box::new(ListParser),
                Box::new(PrimitiveParser),
            ],
        }
    }

    /// Parse raw output with the first applicable strategy.
    ///
    /// If a strategy's predicate matches but its decode fails, the failure is
    /// returned immediately; the chain never falls through past a match.
    pub fn parse(&self, raw: &str) -> Result<Output> {
        if raw.is_empty() {
            return Ok(Output::Null);
        }

        for parser in &self.parsers {
            if parser.can_parse(raw) {
                tracing::debug!(parser = parser.name(), "parsing AppleScript output");
                return parser.parse(raw);
            }
        }

        // Unreachable with the primitive fallback installed.
        Err(parse_error("none", raw, "no parser accepted the output"))
    }
}

impl Default for ParserChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ParserChain {
        ParserChain::new()
    }

    #[test]
    fn test_empty_output_is_null() {
        assert_eq!(chain().parse("").unwrap(), Output::Null);
    }

    #[test]
    fn test_whitespace_output_preserved() {
        assert_eq!(
            chain().parse("   ").unwrap(),
            Output::Text("   ".to_string())
        );
    }

    #[test]
    fn test_primitive_booleans() {
        assert_eq!(chain().parse("true").unwrap(), Output::Bool(true));
        assert_eq!(chain().parse("TRUE").unwrap(), Output::Bool(true));
        assert_eq!(chain().parse("false").unwrap(), Output::Bool(false));
    }

    #[test]
    fn test_primitive_numbers() {
        assert_eq!(chain().parse("42").unwrap(), Output::Int(42));
        assert_eq!(chain().parse("-10").unwrap(), Output::Int(-10));
        assert_eq!(chain().parse("3.25").unwrap(), Output::Real(3.25));
    }

    #[test]
    fn test_primitive_text_trimmed() {
        assert_eq!(
            chain().parse("  hello world  ").unwrap(),
            Output::Text("hello world".to_string())
        );
    }

    #[test]
    fn test_json_object() {
        let out = chain().parse(r#"{"name": "test", "value": 42}"#).unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("name"), Some("test"));
        assert_eq!(record.get("value"), Some(&Output::Int(42)));
    }

    #[test]
    fn test_json_array() {
        assert_eq!(
            chain().parse("[1, 2, 3]").unwrap(),
            Output::List(vec![Output::Int(1), Output::Int(2), Output::Int(3)])
        );
    }

    #[test]
    fn test_malformed_json_fails_loudly() {
        // The JSON predicate matches, so the decode failure must surface
        // instead of falling through to another parser.
        let err = chain().parse(r#"{"invalid": json}"#).unwrap_err();
        match err {
            Error::Parse { parser, .. } => assert_eq!(parser, "json"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_record_not_mistaken_for_json() {
        let out = chain().parse(r#"{name:"test", value:42}"#).unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("name"), Some("test"));
        assert_eq!(record.get("value"), Some(&Output::Int(42)));
    }

    #[test]
    fn test_record_quote_safety() {
        let out = chain().parse(r#"{name:"a, b: c", id:"x"}"#).unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("name"), Some("a, b: c"));
        assert_eq!(record.text("id"), Some("x"));
    }

    #[test]
    fn test_record_escaped_quotes() {
        let out = chain().parse(r#"{name:"say \"hi\"", id:1}"#).unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("name"), Some("say \"hi\""));
        assert_eq!(record.get("id"), Some(&Output::Int(1)));
    }

    #[test]
    fn test_record_missing_value_round_trip() {
        let out = chain().parse("{area:missing value, id:1}").unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.get("area"), Some(&Output::Null));
    }

    #[test]
    fn test_bare_missing_value_is_null() {
        // The token a converted null produces parses back to null.
        assert_eq!(chain().parse("missing value").unwrap(), Output::Null);
    }

    #[test]
    fn test_record_inline_date() {
        let out = chain()
            .parse(r#"{due date:date "Friday, June 20, 2025 at 20:24:26", id:1}"#)
            .unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(
            record.text("due date"),
            Some("Friday, June 20, 2025 at 20:24:26")
        );
    }

    #[test]
    fn test_record_inline_date_missing_closing_quote() {
        let out = chain().parse(r#"{due date:date "Friday, June 20, 2025}"#);
        // The scanner treats the unterminated quote as swallowing the rest;
        // the record still parses with the date text preserved.
        let out = out.unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("due date"), Some("Friday, June 20, 2025"));
    }

    #[test]
    fn test_record_status_identifier_passthrough() {
        let out = chain().parse("{status:open, id:1}").unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(record.text("status"), Some("open"));
    }

    #[test]
    fn test_record_reference_value_passthrough() {
        let out = chain()
            .parse(r#"{project:project id "ABC" of application "Things3", id:1}"#)
            .unwrap();
        let record = out.as_record().unwrap();
        assert_eq!(
            record.text("project"),
            Some(r#"project id "ABC" of application "Things3""#)
        );
    }

    #[test]
    fn test_record_nested_record_value() {
        let out = chain().parse(r#"{child:{name:"x"}, id:1}"#).unwrap();
        let record = out.as_record().unwrap();
        let child = record.get("child").unwrap().as_record().unwrap();
        assert_eq!(child.text("name"), Some("x"));
    }

    #[test]
    fn test_record_preserves_field_order() {
        let out = chain().parse(r#"{b:1, a:2, c:3}"#).unwrap();
        let record = out.as_record().unwrap();
        let keys: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_record_list_two_elements() {
        let out = chain().parse("{{a:1}, {a:2}}").unwrap();
        match out {
            Output::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(
                    items[0].as_record().unwrap().get("a"),
                    Some(&Output::Int(1))
                );
                assert_eq!(
                    items[1].as_record().unwrap().get("a"),
                    Some(&Output::Int(2))
                );
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_record_list_order_preserved() {
        let out = chain()
            .parse(r#"{{name:"first", id:1}, {name:"second", id:2}, {name:"third", id:3}}"#)
            .unwrap();
        match out {
            Output::List(items) => {
                let names: Vec<&str> = items
                    .iter()
                    .map(|item| item.as_record().unwrap().text("name").unwrap())
                    .collect();
                assert_eq!(names, vec!["first", "second", "third"]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_record_list_with_embedded_commas() {
        let out = chain()
            .parse(r#"{{name:"a, b", id:1}, {name:"c}, d", id:2}}"#)
            .unwrap();
        match out {
            Output::List(items) => {
                assert_eq!(items[0].as_record().unwrap().text("name"), Some("a, b"));
                assert_eq!(items[1].as_record().unwrap().text("name"), Some("c}, d"));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_single_record_not_a_list() {
        let out = chain().parse("{a:1}").unwrap();
        assert!(out.as_record().is_some());
    }

    #[test]
    fn test_plain_list_three_items() {
        assert_eq!(
            chain().parse("{a, b, c}").unwrap(),
            Output::List(vec![
                Output::Text("a".to_string()),
                Output::Text("b".to_string()),
                Output::Text("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_plain_list_quoted_items_stripped() {
        assert_eq!(
            chain().parse(r#"{"Errand", "Home, Office"}"#).unwrap(),
            Output::List(vec![
                Output::Text("Errand".to_string()),
                Output::Text("Home, Office".to_string()),
            ])
        );
    }

    #[test]
    fn test_empty_braces_parse_as_empty_record() {
        // `{}` is claimed by the JSON parser, which decodes it as an empty
        // object; AppleScript's empty list and empty record are spelled the
        // same way, so either reading is faithful.
        assert_eq!(chain().parse("{}").unwrap(), Output::Record(Record::new()));
    }

    #[test]
    fn test_bare_date() {
        assert_eq!(
            chain().parse(r#"date "Friday, June 20, 2025 at 20:24:26""#).unwrap(),
            Output::Text("Friday, June 20, 2025 at 20:24:26".to_string())
        );
    }

    #[test]
    fn test_chain_is_deterministic() {
        let inputs = [
            r#"{name:"a, b: c", id:"x"}"#,
            "{{a:1}, {a:2}}",
            "{a, b, c}",
            "42",
            r#"date "June 20, 2025""#,
        ];
        let c = chain();
        for input in inputs {
            assert_eq!(c.parse(input).unwrap(), c.parse(input).unwrap());
        }
    }

    #[test]
    fn test_parse_error_carries_context() {
        let err = chain().parse(r#"["unterminated]"#).unwrap_err();
        match err {
            Error::Parse { parser, output, .. } => {
                assert_eq!(parser, "json");
                assert!(output.contains("unterminated"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_quoted_string_list_not_claimed_by_json() {
        // No colon at all: this is an AppleScript list, not a JSON object.
        assert!(!JsonParser.can_parse(r#"{"Errand", "Home"}"#));
        assert!(ListParser.can_parse(r#"{"Errand", "Home"}"#));
    }
}
