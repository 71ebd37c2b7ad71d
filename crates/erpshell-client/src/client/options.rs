//! Argument shapes shared by the record operations.

use serde_json::{Map, Value, json};

use crate::domain::DomainInput;
use crate::error::{Error, Result};
use crate::reporter::{Reporter, repr};

/// Keyword options as given by a dynamic caller.
pub type Kwargs = Map<String, Value>;

/// Paging, ordering and context for `search`, `count` and `read`.
///
/// A default value produces the minimal legacy call shape: no trailing
/// arguments at all. As soon as any option is set (even one that is then
/// ignored) the full `offset, limit, order, context` tail is sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order: Option<String>,
    pub context: Option<Value>,
    explicit: bool,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self.explicit = true;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self.explicit = true;
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self.explicit = true;
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.explicit = true;
        self
    }

    /// Build options from keyword arguments.
    ///
    /// Unknown keys are reported as `Ignoring: <key> = <value>` and dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Type`] when a known option has the wrong type.
    pub fn from_kwargs(kwargs: Kwargs, reporter: &dyn Reporter) -> Result<Self> {
        let mut options = Self {
            explicit: !kwargs.is_empty(),
            ..Self::default()
        };
        for (key, value) in kwargs {
            match key.as_str() {
                "offset" => options.offset = optional_int(&key, value)?,
                "limit" => options.limit = optional_int(&key, value)?,
                "order" => {
                    options.order = match value {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        other => {
                            return Err(Error::Type(format!("order must be a string, got {}", repr(&other))));
                        }
                    }
                }
                "context" => options.context = Some(value).filter(|v| !v.is_null()),
                _ => {
                    tracing::warn!(option = %key, "ignoring unknown option");
                    reporter.notice(&format!("Ignoring: {key} = {}", repr(&value)));
                }
            }
        }
        Ok(options)
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Trailing `search` arguments.
    pub(crate) fn search_tail(&self) -> Vec<Value> {
        if !self.explicit {
            return Vec::new();
        }
        vec![
            json!(self.offset.unwrap_or(0)),
            json!(self.limit),
            json!(self.order),
            self.context.clone().unwrap_or(Value::Null),
        ]
    }

    /// Report the paging options to a method that takes none.
    ///
    /// Only `search` and `read` page; anywhere else `offset`, `limit` and
    /// `order` are dropped, and each one set is reported like an unknown
    /// option.
    pub(crate) fn report_unused_paging(&self, reporter: &dyn Reporter) {
        let paging = [
            ("offset", self.offset.map(Value::from)),
            ("limit", self.limit.map(Value::from)),
            ("order", self.order.clone().map(Value::from)),
        ];
        for (key, value) in paging.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))) {
            tracing::warn!(option = %key, "ignoring paging option");
            reporter.notice(&format!("Ignoring: {key} = {}", repr(&value)));
        }
    }

    /// Reject the paging options, which mean nothing to a count.
    pub(crate) fn ensure_countable(&self) -> Result<()> {
        let rejected = [
            ("offset", self.offset.is_some()),
            ("limit", self.limit.is_some()),
            ("order", self.order.is_some()),
        ];
        match rejected.iter().find(|(_, set)| *set) {
            Some((name, _)) => Err(Error::Type(format!(
                "count() got an unexpected keyword argument '{name}'"
            ))),
            None => Ok(()),
        }
    }
}

fn optional_int(key: &str, value: Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::Type(format!("{key} must be an integer, got {n}"))),
        other => Err(Error::Type(format!("{key} must be an integer, got {}", repr(&other)))),
    }
}

/// Which fields `read` returns, and how.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldSpec {
    /// Every field.
    #[default]
    All,
    /// The named fields.
    Names(Vec<String>),
    /// A `%(field)s` template; each record is rendered to one string.
    Template { format: String, names: Vec<String> },
}

impl FieldSpec {
    /// Interpret a JSON argument: `null`, a string (space separated names
    /// or a template) or a list of names.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] for any other shape.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::All),
            Value::String(s) => Ok(Self::from(s.as_str())),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(Error::Assertion(format!("field names must be strings, got {}", repr(&other)))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Names),
            other => Err(Error::Assertion(format!("invalid fields argument {}", repr(&other)))),
        }
    }

    /// The `fields` argument sent to `read`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::All => Value::Null,
            Self::Names(names) | Self::Template { names, .. } => json!(names),
        }
    }

    /// Apply a template to what `read` returned: a list of records becomes a
    /// list of strings, a single record a single string. Other specs return
    /// the records unchanged.
    pub fn render(&self, records: Value) -> Value {
        let Self::Template { format, .. } = self else {
            return records;
        };
        match records {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|record| Value::String(render_template(format, record)))
                    .collect(),
            ),
            record @ Value::Object(_) => Value::String(render_template(format, &record)),
            other => other,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(spec: &str) -> Self {
        if spec.contains("%(") {
            return Self::Template {
                format: spec.to_string(),
                names: template_fields(spec),
            };
        }
        let names: Vec<String> = spec.split_ascii_whitespace().map(str::to_string).collect();
        if names.is_empty() { Self::All } else { Self::Names(names) }
    }
}

impl From<Vec<&str>> for FieldSpec {
    fn from(names: Vec<&str>) -> Self {
        Self::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FieldSpec {
    fn from(names: Vec<String>) -> Self {
        Self::Names(names)
    }
}

impl<T: Into<FieldSpec>> From<Option<T>> for FieldSpec {
    fn from(spec: Option<T>) -> Self {
        spec.map_or(Self::All, Into::into)
    }
}

/// Placeholders of a `%(name)s` template, in order of first appearance.
fn template_fields(format: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = format;
    while let Some(start) = rest.find("%(") {
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else { break };
        let name = &after[..end];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    names
}

fn render_template(format: &str, record: &Value) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&(_, '%')) => {
                chars.next();
                out.push('%');
            }
            Some(&(_, '(')) => {
                let tail = &format[i + 2..];
                let Some(end) = tail.find(')') else {
                    out.push_str(&format[i..]);
                    break;
                };
                let name = &tail[..end];
                out.push_str(&match record.get(name) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => repr(other),
                    None => String::new(),
                });
                // skip "(name)" and the conversion character
                let skip = name.chars().count() + 2;
                for _ in 0..=skip {
                    chars.next();
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

/// What `read` is asked to read: literal ids or a domain to search first.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A single id or a list of ids, passed through exactly as given.
    Ids(Value),
    Domain(DomainInput),
}

impl Selector {
    /// Interpret a JSON argument.
    ///
    /// Numbers and lists of numbers (including the empty list) are ids;
    /// strings and lists of terms are domains.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] for `null`, booleans and objects.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Number(_) => Ok(Self::Ids(value)),
            Value::Array(ref items) if items.iter().all(Value::is_number) => Ok(Self::Ids(value)),
            Value::Array(_) | Value::String(_) => DomainInput::from_value(value).map(Self::Domain),
            other => Err(Error::Assertion(format!("expected ids or a domain, got {}", repr(&other)))),
        }
    }
}

impl From<i64> for Selector {
    fn from(id: i64) -> Self {
        Self::Ids(json!(id))
    }
}

impl From<Vec<i64>> for Selector {
    fn from(ids: Vec<i64>) -> Self {
        Self::Ids(json!(ids))
    }
}

impl From<DomainInput> for Selector {
    fn from(domain: DomainInput) -> Self {
        Self::Domain(domain)
    }
}

impl From<&str> for Selector {
    fn from(domain: &str) -> Self {
        Self::Domain(DomainInput::from(domain))
    }
}

impl From<Vec<&str>> for Selector {
    fn from(terms: Vec<&str>) -> Self {
        Self::Domain(DomainInput::from(terms))
    }
}
