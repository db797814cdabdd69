//! Regex and glob matching

use super::string;
use crate::error::ExceptionId;
use crate::interp::{EvalError, EvalResult, Value};
use regex::{Regex, RegexBuilder};

/// Compile a user pattern, reporting failures as `regexfailure`
pub(crate) fn compile(pattern: &str, case_insensitive: bool, position: usize) -> EvalResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|err| {
            EvalError::user(
                ExceptionId::RegexFailure,
                position,
                vec![pattern.to_string(), err.to_string()],
            )
        })
}

/// `subject rlike pattern` / `subject irlike pattern`
pub(crate) fn regex_matches(
    subject: &Value,
    pattern: &Value,
    case_insensitive: bool,
    position: usize,
) -> EvalResult<bool> {
    let re = compile(&pattern.to_str()?, case_insensitive, position)?;
    Ok(re.is_match(&subject.to_str()?))
}

/// `subject like glob`: `*` is any run, `?` any one character, `[...]` a
/// class (`[!...]` negated), `\` escapes. The whole subject must match.
pub(crate) fn glob_matches(subject: &Value, glob: &Value, position: usize) -> EvalResult<bool> {
    let re = compile(&glob_to_regex(&glob.to_str()?), false, position)?;
    Ok(re.is_match(&subject.to_str()?))
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^(?s:");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(r"\\"),
            },
            '[' => {
                let class: String = chars.clone().take_while(|c| *c != ']').collect();
                let closed = chars.clone().nth(class.chars().count()) == Some(']');
                if !closed || class.is_empty() {
                    out.push_str(r"\[");
                    continue;
                }
                for _ in 0..=class.chars().count() {
                    chars.next();
                }
                out.push('[');
                let body = match class.strip_prefix(['!', '^']) {
                    Some(rest) => {
                        out.push('^');
                        rest
                    }
                    None => class.as_str(),
                };
                for c in body.chars() {
                    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push_str(")$");
    out
}

/// `rcount(list)` as `count`; `rcount(pattern, haystack)` counts matches
pub(super) fn rcount(args: &[Value], pos: usize) -> EvalResult<Value> {
    let [pattern, haystack] = args else {
        return string::count(args, pos);
    };
    let re = compile(&pattern.to_str()?, false, pos)?;
    Ok(Value::Int(re.find_iter(&haystack.to_str()?).count() as i64))
}

/// Whole match followed by every group; groups that did not take part are
/// `false`, and so is everything when nothing matched.
pub(super) fn get_matches(args: &[Value], pos: usize) -> EvalResult<Value> {
    let re = compile(&args[0].to_str()?, false, pos)?;
    let haystack = args[1].to_str()?;
    let groups = re.captures_len();
    let items = match re.captures(&haystack) {
        Some(caps) => (0..groups)
            .map(|i| {
                caps.get(i)
                    .map_or(Value::Bool(false), |m| Value::from(m.as_str()))
            })
            .collect(),
        None => vec![Value::Bool(false); groups],
    };
    Ok(Value::Array(items))
}

/// `str_replace_regexp(subject, pattern, replacement)`. Back-references
/// may be written `\1` or `$1`.
pub(super) fn str_replace_regexp(args: &[Value], pos: usize) -> EvalResult<Value> {
    let subject = args[0].to_str()?;
    let re = compile(&args[1].to_str()?, false, pos)?;
    let replacement = expand_backrefs(&args[2].to_str()?);
    Ok(Value::Str(re.replace_all(&subject, replacement.as_str()).into_owned()))
}

/// Rewrite `\N` and `$N` into the `${N}` form; any other `$` is literal
fn expand_backrefs(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        let is_ref = matches!(c, '\\' | '$') && chars.peek().is_some_and(char::is_ascii_digit);
        if is_ref {
            let mut digits = String::new();
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                digits.push(d);
            }
            out.push_str(&format!("${{{digits}}}"));
        } else if c == '$' {
            out.push_str("$$");
        } else {
            out.push(c);
        }
    }
    out
}
