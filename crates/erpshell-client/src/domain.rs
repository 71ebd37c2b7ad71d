//! Domain compiler.
//!
//! A domain is an ordered list of filter terms, ANDed together by the server.
//! Users type terms loosely (`"name like Morice"`, `"active = False"`); the
//! compiler turns them into the canonical `[field, operator, value]` triples
//! the server expects. Terms that are already structured pass through
//! untouched, as do the prefix operators `'|'`, `'&'` and `'!'`.
//!
//! ```
//! use erpshell_client::domain::{self, DomainInput};
//! use erpshell_client::MemoryReporter;
//! use serde_json::json;
//!
//! let reporter = MemoryReporter::new();
//! let domain = domain::compile(DomainInput::from(vec!["name like Morice"]), &reporter).unwrap();
//! assert_eq!(domain.to_value(), json!([["name", "like", "Morice"]]));
//! ```

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::reporter::{Reporter, repr};

/// Prefix operators that combine the terms following them.
pub const LOGICAL_OPERATORS: [&str; 3] = ["|", "&", "!"];

/// Comparison operators understood in loose terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Le,
    Lt,
    Gt,
    Ge,
    Like,
    In,
    NotIn,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Le => "<=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "like",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    /// Operator spelled by a single token. `not in` takes two tokens and is
    /// recognised by the term parser instead.
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Self::Eq,
            "!=" => Self::Ne,
            "<=" => Self::Le,
            "<" => Self::Lt,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "like" => Self::Like,
            "in" => Self::In,
            _ => return None,
        })
    }

    fn wants_sequence(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled domain term.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainTerm {
    /// A term parsed from text.
    Condition {
        field: String,
        operator: Operator,
        value: Value,
    },
    /// A term that was already structured (a triple, or a logical operator).
    Structured(Value),
}

impl DomainTerm {
    pub fn condition(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Condition {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Condition {
                field,
                operator,
                value,
            } => json!([field, operator.as_str(), value]),
            Self::Structured(value) => value.clone(),
        }
    }

    /// Parse one loose `"<field> <op> <value>"` term.
    ///
    /// Tokens are split on ASCII whitespace; the value is every token after
    /// the operator, rejoined with single spaces, then read as a literal when
    /// it looks like one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDomain`] when the term has fewer than three tokens, the
    /// operator is unknown, or `in`/`not in` is not followed by a sequence.
    pub fn parse(term: &str) -> Result<Self> {
        let tokens: Vec<&str> = term.split_ascii_whitespace().collect();
        if tokens.len() < 3 {
            return Err(Error::InvalidDomain(format!("Cannot parse term {}", repr(&json!(term)))));
        }

        let (operator, rest) = if tokens[1] == "not" && tokens[2] == "in" {
            if tokens.len() < 4 {
                return Err(Error::InvalidDomain(format!("Cannot parse term {}", repr(&json!(term)))));
            }
            (Operator::NotIn, &tokens[3..])
        } else {
            let operator = Operator::from_token(tokens[1]).ok_or_else(|| {
                Error::InvalidDomain(format!(
                    "Invalid operator {} in term {}",
                    repr(&json!(tokens[1])),
                    repr(&json!(term))
                ))
            })?;
            (operator, &tokens[2..])
        };

        let raw = rest.join(" ");
        let value = match parse_literal(&raw) {
            Some(value) => value,
            None if operator.wants_sequence() => {
                return Err(Error::InvalidDomain(format!(
                    "Operator '{operator}' needs a list value in term {}",
                    repr(&json!(term))
                )));
            }
            None => Value::String(raw),
        };
        if operator.wants_sequence() && !value.is_array() {
            return Err(Error::InvalidDomain(format!(
                "Operator '{operator}' needs a list value in term {}",
                repr(&json!(term))
            )));
        }

        Ok(Self::Condition {
            field: tokens[0].to_string(),
            operator,
            value,
        })
    }
}

impl Serialize for DomainTerm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// A compiled domain. Empty means "all records".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(Vec<DomainTerm>);

impl Domain {
    pub fn new(terms: Vec<DomainTerm>) -> Self {
        Self(terms)
    }

    pub fn terms(&self) -> &[DomainTerm] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(DomainTerm::to_value).collect())
    }
}

impl Serialize for Domain {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.0)
    }
}

/// One element of a domain as the caller wrote it.
#[derive(Debug, Clone, PartialEq)]
pub enum TermInput {
    /// Already structured; passed through unchanged.
    Structured(Value),
    /// Loose text that needs parsing.
    Text(String),
}

impl From<&str> for TermInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TermInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for TermInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

impl<V: Into<Value>> From<(&str, &str, V)> for TermInput {
    fn from((field, op, value): (&str, &str, V)) -> Self {
        Self::Structured(json!([field, op, value.into()]))
    }
}

/// A domain argument before compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainInput {
    /// A list of terms.
    Terms(Vec<TermInput>),
    /// A bare string standing for a one-term list. Accepted for
    /// compatibility; compiling it emits a deprecation warning.
    Legacy(String),
}

impl Default for DomainInput {
    fn default() -> Self {
        Self::Terms(Vec::new())
    }
}

impl DomainInput {
    /// Interpret a JSON argument as a domain.
    ///
    /// `null` is the empty domain, a string is the legacy form, an array is a
    /// term list.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] for numbers, booleans and objects.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(s) => Ok(Self::Legacy(s)),
            Value::Array(items) => Ok(Self::Terms(items.into_iter().map(TermInput::from).collect())),
            other => Err(Error::Assertion(format!("domain must be a list, got {}", repr(&other)))),
        }
    }
}

impl From<&str> for DomainInput {
    fn from(s: &str) -> Self {
        Self::Legacy(s.to_string())
    }
}

impl<T: Into<TermInput>> From<Vec<T>> for DomainInput {
    fn from(terms: Vec<T>) -> Self {
        Self::Terms(terms.into_iter().map(Into::into).collect())
    }
}

impl From<Domain> for DomainInput {
    fn from(domain: Domain) -> Self {
        Self::Terms(domain.0.iter().map(|t| TermInput::Structured(t.to_value())).collect())
    }
}

/// Compile a domain argument.
///
/// # Errors
///
/// [`Error::InvalidDomain`] for the first malformed text term.
pub fn compile(input: DomainInput, reporter: &dyn Reporter) -> Result<Domain> {
    let terms = match input {
        DomainInput::Terms(terms) => terms,
        DomainInput::Legacy(text) => {
            let message = format!("Domain should be a list: {}", repr(&json!([text])));
            tracing::warn!(domain = %text, "legacy string domain");
            reporter.warn(&message);
            vec![TermInput::Text(text)]
        }
    };

    terms
        .into_iter()
        .map(|term| match term {
            TermInput::Structured(value) => Ok(DomainTerm::Structured(value)),
            TermInput::Text(text) if LOGICAL_OPERATORS.contains(&text.as_str()) => {
                Ok(DomainTerm::Structured(Value::String(text)))
            }
            TermInput::Text(text) => DomainTerm::parse(&text),
        })
        .collect::<Result<Vec<_>>>()
        .map(Domain)
}

/// Read a Python-style literal: numbers, quoted strings, `True`, `False`,
/// `None`, lists and tuples of those. Returns `None` when the whole input is
/// not one literal.
pub fn parse_literal(input: &str) -> Option<Value> {
    let mut parser = LiteralParser {
        chars: input.char_indices().peekable(),
        src: input,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(value)
}

struct LiteralParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl LiteralParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_ascii_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        let &(start, first) = self.chars.peek()?;
        match first {
            '[' => self.sequence(']'),
            '(' => self.sequence(')'),
            '\'' | '"' => self.string(first),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(start),
            c if c.is_ascii_alphabetic() => self.keyword(start),
            _ => None,
        }
    }

    fn sequence(&mut self, close: char) -> Option<Value> {
        self.chars.next();
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.chars.next_if(|&(_, c)| c == close).is_some() {
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.chars.next()? {
                (_, ',') => saw_comma = true,
                (_, c) if c == close => break,
                _ => return None,
            }
        }
        // `(x)` is just a parenthesised value
        if close == ')' && items.len() == 1 && !saw_comma {
            return items.pop();
        }
        Some(Value::Array(items))
    }

    fn string(&mut self, quote: char) -> Option<Value> {
        self.chars.next();
        let mut out = String::new();
        loop {
            let (_, c) = self.chars.next()?;
            match c {
                '\\' => {
                    let (_, escaped) = self.chars.next()?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c == quote => return Some(Value::String(out)),
                c => out.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Option<Value> {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_') {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.src[start..end];
        let digits = text.trim_start_matches(['-', '+']);
        // leading zeros are not a valid literal
        if digits.len() > 1 && digits.starts_with('0') && digits.as_bytes()[1].is_ascii_digit() {
            return None;
        }
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::from(n));
        }
        let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
        serde_json::Number::from_f64(f).map(Value::Number)
    }

    fn keyword(&mut self, start: usize) -> Option<Value> {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        match &self.src[start..end] {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            "None" => Some(Value::Null),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{Level, MemoryReporter};
    use pretty_assertions::assert_eq;

    fn compile_texts(terms: &[&str]) -> Result<Value> {
        compile(DomainInput::from(terms.to_vec()), &MemoryReporter::new()).map(|d| d.to_value())
    }

    #[test]
    fn test_loose_terms() {
        assert_eq!(
            compile_texts(&["name like Morice"]).unwrap(),
            json!([["name", "like", "Morice"]])
        );
        assert_eq!(
            compile_texts(&["name = mushroom", "state != draft"]).unwrap(),
            json!([["name", "=", "mushroom"], ["state", "!=", "draft"]])
        );
        assert_eq!(
            compile_texts(&["active = False"]).unwrap(),
            json!([["active", "=", false]])
        );
        assert_eq!(compile_texts(&["id >= 42"]).unwrap(), json!([["id", ">=", 42]]));
    }

    #[test]
    fn test_value_with_spaces_is_rejoined() {
        assert_eq!(
            compile_texts(&["name  like   Jean  Morice"]).unwrap(),
            json!([["name", "like", "Jean Morice"]])
        );
        assert_eq!(
            compile_texts(&["name = 'a  b'"]).unwrap(),
            json!([["name", "=", "a b"]])
        );
    }

    #[test]
    fn test_membership_operators() {
        assert_eq!(
            compile_texts(&["state in ['draft', 'open']"]).unwrap(),
            json!([["state", "in", ["draft", "open"]]])
        );
        assert_eq!(
            compile_texts(&["id not in (1, 2)"]).unwrap(),
            json!([["id", "not in", [1, 2]]])
        );
        assert!(matches!(
            compile_texts(&["state in draft"]),
            Err(Error::InvalidDomain(_))
        ));
        assert!(matches!(
            compile_texts(&["state not in"]),
            Err(Error::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_malformed_terms() {
        for term in ["abc", "< id", "name Morice", "name ~ Morice", "name not like x"] {
            assert!(
                matches!(compile_texts(&[term]), Err(Error::InvalidDomain(_))),
                "{term} should not compile"
            );
        }
    }

    #[test]
    fn test_structured_terms_pass_through() {
        let terms = vec![
            TermInput::from(json!("|")),
            TermInput::from(("name", "ilike", "x")),
            TermInput::from(json!(["id", "child_of", [1]])),
        ];
        let domain = compile(DomainInput::Terms(terms), &MemoryReporter::new()).unwrap();
        assert_eq!(
            domain.to_value(),
            json!(["|", ["name", "ilike", "x"], ["id", "child_of", [1]]])
        );
    }

    #[test]
    fn test_empty_domain() {
        let reporter = MemoryReporter::new();
        let domain = compile(DomainInput::default(), &reporter).unwrap();
        assert!(domain.is_empty());
        assert_eq!(domain.to_value(), json!([]));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_legacy_string_warns_once() {
        let reporter = MemoryReporter::new();
        let domain = compile(DomainInput::from("name like Morice"), &reporter).unwrap();
        assert_eq!(domain.to_value(), json!([["name", "like", "Morice"]]));
        assert_eq!(
            reporter.messages(Level::Warning),
            vec!["Domain should be a list: ['name like Morice']".to_string()]
        );
    }

    #[test]
    fn test_from_value() {
        assert_eq!(DomainInput::from_value(Value::Null).unwrap(), DomainInput::default());
        assert!(matches!(
            DomainInput::from_value(json!("a = 1")).unwrap(),
            DomainInput::Legacy(_)
        ));
        assert!(matches!(
            DomainInput::from_value(json!({"a": 1})),
            Err(Error::Assertion(_))
        ));
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_literal("42"), Some(json!(42)));
        assert_eq!(parse_literal("-4.5"), Some(json!(-4.5)));
        assert_eq!(parse_literal("None"), Some(Value::Null));
        assert_eq!(parse_literal("\"x y\""), Some(json!("x y")));
        assert_eq!(parse_literal("(1,)"), Some(json!([1])));
        assert_eq!(parse_literal("(1)"), Some(json!(1)));
        assert_eq!(parse_literal("[True, 'a', []]"), Some(json!([true, "a", []])));
        assert_eq!(parse_literal("Morice"), None);
        assert_eq!(parse_literal("007"), None);
        assert_eq!(parse_literal("1 2"), None);
        assert_eq!(parse_literal("'open"), None);
    }
}
