//! Evaluation outcome and its flat serialized form

use crate::error::{UserVisibleException, UserVisibleWarning};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a rule stopped early. The `class` tag names the variant in the
/// serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum RuleException {
    User(UserVisibleException),
    ConditionLimit { limit: u32 },
}

impl fmt::Display for RuleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleException::User(e) => write!(f, "{e}"),
            RuleException::ConditionLimit { limit } => write!(f, "condition limit of {limit} reached"),
        }
    }
}

/// Result of checking one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckerStatus {
    pub result: bool,
    /// Tokens came from the cache
    pub warm_cache: bool,
    pub exception: Option<RuleException>,
    pub warnings: Vec<UserVisibleWarning>,
    pub conds_used: u32,
}

impl RuleCheckerStatus {
    pub fn matched(result: bool, conds_used: u32) -> Self {
        RuleCheckerStatus {
            result,
            conds_used,
            ..Self::default()
        }
    }

    pub fn failed(exception: RuleException, conds_used: u32) -> Self {
        RuleCheckerStatus {
            exception: Some(exception),
            conds_used,
            ..Self::default()
        }
    }

    pub fn user_exception(&self) -> Option<&UserVisibleException> {
        match &self.exception {
            Some(RuleException::User(e)) => Some(e),
            _ => None,
        }
    }

    /// Flat JSON object suitable for caching across processes
    pub fn to_array(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_array(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExceptionId, WarningId};

    fn sample() -> RuleCheckerStatus {
        RuleCheckerStatus {
            result: false,
            warm_cache: true,
            exception: Some(RuleException::User(UserVisibleException::new(
                ExceptionId::RegexFailure,
                8,
                vec!["(".into(), "unclosed group".into()],
            ))),
            warnings: vec![UserVisibleWarning::new(WarningId::MatchEmptyRegex, 2, vec![])],
            conds_used: 3,
        }
    }

    #[test]
    fn test_to_array_shape() {
        let json = sample().to_array().unwrap();
        insta::assert_snapshot!(json.to_string(), @r#"{"conds_used":3,"exception":{"class":"user","id":"regexfailure","params":["(","unclosed group"],"position":8},"result":false,"warm_cache":true,"warnings":[{"id":"match-empty-regex","params":[],"position":2}]}"#);
    }

    #[test]
    fn test_roundtrip_user_exception() {
        let status = sample();
        let back = RuleCheckerStatus::from_array(status.to_array().unwrap()).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn test_roundtrip_condition_limit() {
        let status = RuleCheckerStatus::failed(RuleException::ConditionLimit { limit: 10 }, 11);
        let json = status.to_array().unwrap();
        assert_eq!(json["exception"]["class"], "conditionlimit");
        assert_eq!(RuleCheckerStatus::from_array(json).unwrap(), status);
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let json = serde_json::json!({
            "result": true,
            "warm_cache": false,
            "exception": {"class": "bogus"},
            "warnings": [],
            "conds_used": 0
        });
        assert!(RuleCheckerStatus::from_array(json).is_err());
    }

    #[test]
    fn test_user_exception_accessor() {
        assert!(RuleCheckerStatus::matched(true, 1).user_exception().is_none());
        assert_eq!(sample().user_exception().unwrap().id, ExceptionId::RegexFailure);
    }
}
