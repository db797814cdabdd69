//! Error types and reporting
//!
//! Two taxonomies live here. [`UserVisibleException`] is the expected,
//! frequent kind: a rule author wrote something invalid and is told so by a
//! stable [`ExceptionId`]. [`InternalError`] signals a bug in the interpreter
//! itself and is never rendered as a rule error.

use crate::ast::Span;
use crate::util::{find_similar_name, format_suggestion_hint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result type alias for the tokenizer, parser and static checker
pub type Result<T> = std::result::Result<T, UserVisibleException>;

/// Stable identifier of a user-visible exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionId {
    DivideByZero,
    UnrecognisedVar,
    NotArray,
    OutOfBounds,
    NegativeIndex,
    UnclosedComment,
    UnrecognisedToken,
    UnclosedString,
    UnexpectedToken,
    ExpectedNotFound,
    UnexpectedAtEnd,
    UnrecognisedKeyword,
    DisabledVar,
    VariableVariable,
    OverrideBuiltin,
    UseBuiltin,
    UnknownFunction,
    RegexFailure,
    InvalidIpRange,
    NoParams,
    NotEnoughArgs,
    TooManyArgs,
    UnusedVars,
}

impl ExceptionId {
    pub const ALL: &'static [ExceptionId] = &[
        ExceptionId::DivideByZero,
        ExceptionId::UnrecognisedVar,
        ExceptionId::NotArray,
        ExceptionId::OutOfBounds,
        ExceptionId::NegativeIndex,
        ExceptionId::UnclosedComment,
        ExceptionId::UnrecognisedToken,
        ExceptionId::UnclosedString,
        ExceptionId::UnexpectedToken,
        ExceptionId::ExpectedNotFound,
        ExceptionId::UnexpectedAtEnd,
        ExceptionId::UnrecognisedKeyword,
        ExceptionId::DisabledVar,
        ExceptionId::VariableVariable,
        ExceptionId::OverrideBuiltin,
        ExceptionId::UseBuiltin,
        ExceptionId::UnknownFunction,
        ExceptionId::RegexFailure,
        ExceptionId::InvalidIpRange,
        ExceptionId::NoParams,
        ExceptionId::NotEnoughArgs,
        ExceptionId::TooManyArgs,
        ExceptionId::UnusedVars,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExceptionId::DivideByZero => "dividebyzero",
            ExceptionId::UnrecognisedVar => "unrecognisedvar",
            ExceptionId::NotArray => "notarray",
            ExceptionId::OutOfBounds => "outofbounds",
            ExceptionId::NegativeIndex => "negativeindex",
            ExceptionId::UnclosedComment => "unclosedcomment",
            ExceptionId::UnrecognisedToken => "unrecognisedtoken",
            ExceptionId::UnclosedString => "unclosedstring",
            ExceptionId::UnexpectedToken => "unexpectedtoken",
            ExceptionId::ExpectedNotFound => "expectednotfound",
            ExceptionId::UnexpectedAtEnd => "unexpectedatend",
            ExceptionId::UnrecognisedKeyword => "unrecognisedkeyword",
            ExceptionId::DisabledVar => "disabledvar",
            ExceptionId::VariableVariable => "variablevariable",
            ExceptionId::OverrideBuiltin => "overridebuiltin",
            ExceptionId::UseBuiltin => "usebuiltin",
            ExceptionId::UnknownFunction => "unknownfunction",
            ExceptionId::RegexFailure => "regexfailure",
            ExceptionId::InvalidIpRange => "invalidiprange",
            ExceptionId::NoParams => "noparams",
            ExceptionId::NotEnoughArgs => "notenoughargs",
            ExceptionId::TooManyArgs => "toomanyargs",
            ExceptionId::UnusedVars => "unusedvars",
        }
    }

    /// Human-readable description for rule authors
    pub fn description(self) -> &'static str {
        match self {
            ExceptionId::DivideByZero => "division by zero",
            ExceptionId::UnrecognisedVar => "unrecognised variable",
            ExceptionId::NotArray => "value is not an array",
            ExceptionId::OutOfBounds => "array index out of bounds",
            ExceptionId::NegativeIndex => "negative array index",
            ExceptionId::UnclosedComment => "unclosed comment",
            ExceptionId::UnrecognisedToken => "unrecognised token",
            ExceptionId::UnclosedString => "unclosed string literal",
            ExceptionId::UnexpectedToken => "unexpected token",
            ExceptionId::ExpectedNotFound => "expected token not found",
            ExceptionId::UnexpectedAtEnd => "unexpected data after the end of the rule",
            ExceptionId::UnrecognisedKeyword => "keyword used where a value was expected",
            ExceptionId::DisabledVar => "variable has been disabled",
            ExceptionId::VariableVariable => "variable name must be a string literal",
            ExceptionId::OverrideBuiltin => "cannot assign to a built-in name",
            ExceptionId::UseBuiltin => "built-in function used as a value",
            ExceptionId::UnknownFunction => "unknown function",
            ExceptionId::RegexFailure => "invalid regular expression",
            ExceptionId::InvalidIpRange => "invalid IP range",
            ExceptionId::NoParams => "function called without arguments",
            ExceptionId::NotEnoughArgs => "not enough arguments",
            ExceptionId::TooManyArgs => "too many arguments",
            ExceptionId::UnusedVars => "variable assigned but never used",
        }
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ExceptionId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown exception id: {s}"))
    }
}

/// An error in a rule, reported to its author
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct UserVisibleException {
    pub id: ExceptionId,
    /// Character offset where the problem was detected
    pub position: usize,
    /// Context: the offending token, name, pattern, counts...
    pub params: Vec<String>,
}

impl UserVisibleException {
    pub fn new(id: ExceptionId, position: usize, params: Vec<String>) -> Self {
        Self {
            id,
            position,
            params,
        }
    }

    pub fn at(id: ExceptionId, position: usize) -> Self {
        Self::new(id, position, Vec::new())
    }

    pub fn span(&self) -> Span {
        Span::point(self.position)
    }

    /// Full message including parameters
    pub fn message(&self) -> String {
        if self.params.is_empty() {
            self.id.description().to_string()
        } else {
            format!("{}: {}", self.id.description(), self.params.join(", "))
        }
    }
}

impl fmt::Display for UserVisibleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at char {}", self.id, self.position)?;
        if !self.params.is_empty() {
            write!(f, ": {}", self.params.join(", "))?;
        }
        Ok(())
    }
}

/// Stable identifier of a non-fatal warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningId {
    /// A regex operator was given an empty pattern, which matches everything
    MatchEmptyRegex,
}

impl WarningId {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningId::MatchEmptyRegex => "match-empty-regex",
        }
    }
}

/// A non-fatal diagnostic collected during evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVisibleWarning {
    pub id: WarningId,
    pub position: usize,
    pub params: Vec<String>,
}

impl UserVisibleWarning {
    pub fn new(id: WarningId, position: usize, params: Vec<String>) -> Self {
        Self {
            id,
            position,
            params,
        }
    }
}

impl fmt::Display for UserVisibleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning {} at char {}", self.id.as_str(), self.position)
    }
}

/// Interpreter bug. Reaching one of these means an invariant was broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("cannot cast an undefined value to {target}")]
    UndefinedCast { target: &'static str },

    #[error("cannot compare undefined values")]
    UndefinedComparison,

    #[error("undefined values carry no payload")]
    UndefinedPayload,

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

/// Render an exception with ariadne into a plain-text string
pub fn render_error(filename: &str, source: &str, error: &UserVisibleException) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let len = source.chars().count();
    let start = error.position.min(len.saturating_sub(1));
    let range = start..(start + 1).min(len);

    let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_config(Config::default().with_color(false))
        .with_code(error.id.as_str())
        .with_message(error.id.description())
        .with_label(Label::new((filename, range)).with_message(error.message()));

    if let Some(hint) = suggestion_for(error) {
        report = report.with_help(hint.trim_start().to_string());
    }

    let mut out = Vec::new();
    if report
        .finish()
        .write((filename, Source::from(source)), &mut out)
        .is_err()
    {
        return error.to_string();
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Report error with ariadne on stderr
pub fn report_error(filename: &str, source: &str, error: &UserVisibleException) {
    eprint!("{}", render_error(filename, source, error));
}

fn suggestion_for(error: &UserVisibleException) -> Option<String> {
    let name = error.params.first()?;
    let candidates: Vec<&str> = match error.id {
        ExceptionId::UnknownFunction => crate::builtins::function_names().collect(),
        ExceptionId::UnrecognisedVar => crate::keywords::builtin_var_names().collect(),
        _ => return None,
    };
    let hint = format_suggestion_hint(find_similar_name(name, &candidates, 2));
    if hint.is_empty() { None } else { Some(hint) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_id_roundtrip_through_str() {
        for id in ExceptionId::ALL {
            assert_eq!(id.as_str().parse::<ExceptionId>(), Ok(*id));
        }
        assert!("nosuchthing".parse::<ExceptionId>().is_err());
    }

    #[test]
    fn test_exception_id_serde_matches_as_str() {
        for id in ExceptionId::ALL {
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn test_warning_id_serde() {
        let json = serde_json::to_string(&WarningId::MatchEmptyRegex).unwrap();
        assert_eq!(json, "\"match-empty-regex\"");
    }

    #[test]
    fn test_display_with_params() {
        let err = UserVisibleException::new(
            ExceptionId::UnknownFunction,
            4,
            vec!["lcasee".to_string()],
        );
        insta::assert_snapshot!(err.to_string(), @"unknownfunction at char 4: lcasee");
    }

    #[test]
    fn test_message_without_params() {
        let err = UserVisibleException::at(ExceptionId::DivideByZero, 2);
        assert_eq!(err.message(), "division by zero");
        assert_eq!(err.span(), Span::point(2));
    }

    #[test]
    fn test_render_error_mentions_id_and_hint() {
        let source = "lcasee(\"A\")";
        let err = UserVisibleException::new(
            ExceptionId::UnknownFunction,
            0,
            vec!["lcasee".to_string()],
        );
        let rendered = render_error("rule", source, &err);
        assert!(rendered.contains("unknownfunction"));
        assert!(rendered.contains("did you mean `lcase`?"));
    }

    #[test]
    fn test_internal_error_messages() {
        let err = InternalError::UndefinedCast { target: "int" };
        assert_eq!(err.to_string(), "cannot cast an undefined value to int");
    }
}
