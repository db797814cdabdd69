//! String, cast and membership functions

use super::equivset;
use crate::interp::{EvalResult, Value, ValueType};

pub(super) fn lcase(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(args[0].to_str()?.to_lowercase()))
}

pub(super) fn ucase(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(args[0].to_str()?.to_uppercase()))
}

/// Element count for arrays, character count otherwise
pub(super) fn length(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let n = match &args[0] {
        Value::Array(items) => items.len(),
        other => other.to_str()?.chars().count(),
    };
    Ok(Value::Int(n as i64))
}

pub(super) fn to_string(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(args[0].cast(ValueType::Str)?)
}

pub(super) fn to_int(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(args[0].cast(ValueType::Int)?)
}

pub(super) fn to_float(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(args[0].cast(ValueType::Float)?)
}

pub(super) fn to_bool(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(args[0].cast(ValueType::Bool)?)
}

pub(super) fn ccnorm(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(equivset::normalize(&args[0].to_str()?)))
}

pub(super) fn norm(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let s = equivset::normalize(&args[0].to_str()?);
    Ok(Value::Str(strip_whitespace(&strip_specials(&collapse_doubles(&s)))))
}

/// Share of characters that are neither word characters nor whitespace
pub(super) fn specialratio(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let s = args[0].to_str()?;
    let total = s.chars().count();
    if total == 0 {
        return Ok(Value::Float(0.0));
    }
    let specials = s
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '_' && !c.is_whitespace())
        .count();
    Ok(Value::Float(specials as f64 / total as f64))
}

pub(super) fn rmspecials(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(strip_specials(&args[0].to_str()?)))
}

pub(super) fn rmdoubles(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(collapse_doubles(&args[0].to_str()?)))
}

pub(super) fn rmwhitespace(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(strip_whitespace(&args[0].to_str()?)))
}

fn strip_specials(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

fn collapse_doubles(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last = None;
    for c in s.chars() {
        if last != Some(c) {
            out.push(c);
        }
        last = Some(c);
    }
    out
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `count(list)` counts array elements or comma-separated items;
/// `count(needle, haystack)` counts non-overlapping occurrences.
pub(super) fn count(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let n = match args {
        [Value::Array(items)] => items.len(),
        [single] => single.to_str()?.matches(',').count() + 1,
        [needle, haystack, ..] => {
            let needle = needle.to_str()?;
            if needle.is_empty() {
                0
            } else {
                haystack.to_str()?.matches(needle.as_str()).count()
            }
        }
        [] => 0,
    };
    Ok(Value::Int(n as i64))
}

/// `substr(s, start[, length])` over characters. A negative start counts
/// from the end; a negative length stops that many characters before it.
pub(super) fn substr(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let chars: Vec<char> = args[0].to_str()?.chars().collect();
    let n = chars.len() as i64;
    let start = args[1].to_int()?;
    let start = if start < 0 { (n + start).max(0) } else { start.min(n) };
    let end = match args.get(2) {
        None => n,
        Some(len) => {
            let len = len.to_int()?;
            if len < 0 {
                (n + len).max(start)
            } else {
                start.saturating_add(len).min(n)
            }
        }
    };
    Ok(Value::Str(chars[start as usize..end as usize].iter().collect()))
}

/// Character offset of the first occurrence, or -1
pub(super) fn strpos(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let haystack: Vec<char> = args[0].to_str()?.chars().collect();
    let needle = args[1].to_str()?;
    let n = haystack.len() as i64;
    let offset = match args.get(2) {
        Some(offset) => offset.to_int()?,
        None => 0,
    };
    let offset = if offset < 0 { n + offset } else { offset };
    if needle.is_empty() || offset < 0 || offset > n {
        return Ok(Value::Int(-1));
    }

    let offset = offset as usize;
    let tail: String = haystack[offset..].iter().collect();
    let found = tail
        .find(needle.as_str())
        .map_or(-1, |byte| (offset + tail[..byte].chars().count()) as i64);
    Ok(Value::Int(found))
}

/// `str_replace(subject, search, replacement)`
pub(super) fn str_replace(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let subject = args[0].to_str()?;
    let search = args[1].to_str()?;
    if search.is_empty() {
        return Ok(Value::Str(subject));
    }
    Ok(Value::Str(subject.replace(&search, &args[2].to_str()?)))
}

/// Escape every regex metacharacter. The escaped set is the one
/// `regex::escape` uses, which is the set the match operators interpret.
pub(super) fn rescape(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(Value::Str(regex::escape(&args[0].to_str()?)))
}

/// Decode HTML entities
pub(super) fn sanitize(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let s = args[0].to_str()?;
    Ok(Value::Str(html_escape::decode_html_entities(&s).into_owned()))
}

pub(super) fn contains_any(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let haystack = args[0].to_str()?;
    let needles = strings(&args[1..])?;
    Ok(Value::Bool(needles.iter().any(|n| contains_str(&haystack, n))))
}

pub(super) fn contains_all(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let haystack = args[0].to_str()?;
    let needles = strings(&args[1..])?;
    Ok(Value::Bool(needles.iter().all(|n| contains_str(&haystack, n))))
}

pub(super) fn ccnorm_contains_any(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let haystack = equivset::normalize(&args[0].to_str()?);
    let needles = strings(&args[1..])?;
    Ok(Value::Bool(
        needles
            .iter()
            .any(|n| contains_str(&haystack, &equivset::normalize(n))),
    ))
}

pub(super) fn ccnorm_contains_all(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let haystack = equivset::normalize(&args[0].to_str()?);
    let needles = strings(&args[1..])?;
    Ok(Value::Bool(
        needles
            .iter()
            .all(|n| contains_str(&haystack, &equivset::normalize(n))),
    ))
}

/// True if the first argument is strictly equal to any of the others
pub(super) fn equals_to_any(args: &[Value], _pos: usize) -> EvalResult<Value> {
    let (first, rest) = (&args[0], &args[1..]);
    for candidate in rest {
        if first.strict_equals(candidate)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// Substring test shared by the `contains` and `in` operators
pub(crate) fn contains(haystack: &Value, needle: &Value) -> EvalResult<bool> {
    Ok(contains_str(&haystack.to_str()?, &needle.to_str()?))
}

/// An empty needle never matches
fn contains_str(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

fn strings(values: &[Value]) -> EvalResult<Vec<String>> {
    values
        .iter()
        .map(|v| v.to_str().map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    fn call(f: fn(&[Value], usize) -> EvalResult<Value>, args: &[Value]) -> Value {
        f(args, 0).unwrap()
    }

    #[test]
    fn test_case_functions() {
        assert_eq!(call(lcase, &[s("ÀBC")]), s("àbc"));
        assert_eq!(call(ucase, &[s("straße")]), s("STRASSE"));
    }

    #[test]
    fn test_length() {
        assert_eq!(call(length, &[s("héllo")]), Value::Int(5));
        assert_eq!(
            call(length, &[Value::Array(vec![Value::Int(1), Value::Int(2)])]),
            Value::Int(2)
        );
        assert_eq!(call(length, &[Value::Int(1234)]), Value::Int(4));
    }

    #[test]
    fn test_casts() {
        assert_eq!(call(to_int, &[s("42abc")]), Value::Int(42));
        assert_eq!(call(to_float, &[s("1.5")]), Value::Float(1.5));
        assert_eq!(call(to_bool, &[s("0")]), Value::Bool(false));
        assert_eq!(call(to_string, &[Value::Float(2.0)]), s("2"));
    }

    #[test]
    fn test_cleanup_functions() {
        assert_eq!(call(rmdoubles, &[s("aabbbcdda")]), s("abcda"));
        assert_eq!(call(rmspecials, &[s("a!b @c_")]), s("ab c"));
        assert_eq!(call(rmwhitespace, &[s(" a \t b\nc ")]), s("abc"));
    }

    #[test]
    fn test_specialratio() {
        assert_eq!(call(specialratio, &[s("a!b?")]), Value::Float(0.5));
        assert_eq!(call(specialratio, &[s("")]), Value::Float(0.0));
    }

    #[test]
    fn test_norm() {
        assert_eq!(call(norm, &[s("!!ab  cc")]), s("ABC"));
    }

    #[test]
    fn test_count() {
        assert_eq!(call(count, &[s("a,b,c")]), Value::Int(3));
        assert_eq!(call(count, &[Value::Array(vec![])]), Value::Int(0));
        assert_eq!(call(count, &[s("ab"), s("abcabab")]), Value::Int(3));
        assert_eq!(call(count, &[s("aa"), s("aaaa")]), Value::Int(2));
        assert_eq!(call(count, &[s(""), s("abc")]), Value::Int(0));
    }

    #[test]
    fn test_substr() {
        assert_eq!(call(substr, &[s("abcdef"), Value::Int(2)]), s("cdef"));
        assert_eq!(call(substr, &[s("abcdef"), Value::Int(1), Value::Int(3)]), s("bcd"));
        assert_eq!(call(substr, &[s("abcdef"), Value::Int(-2)]), s("ef"));
        assert_eq!(call(substr, &[s("abcdef"), Value::Int(1), Value::Int(-2)]), s("bcd"));
        assert_eq!(call(substr, &[s("abc"), Value::Int(10)]), s(""));
        assert_eq!(call(substr, &[s("héllo"), Value::Int(1), Value::Int(1)]), s("é"));
    }

    #[test]
    fn test_strpos() {
        assert_eq!(call(strpos, &[s("héllo"), s("l")]), Value::Int(2));
        assert_eq!(call(strpos, &[s("abcabc"), s("b"), Value::Int(2)]), Value::Int(4));
        assert_eq!(call(strpos, &[s("abc"), s("z")]), Value::Int(-1));
        assert_eq!(call(strpos, &[s("abc"), s("")]), Value::Int(-1));
        assert_eq!(call(strpos, &[s("abcabc"), s("a"), Value::Int(-3)]), Value::Int(3));
    }

    #[test]
    fn test_str_replace() {
        assert_eq!(call(str_replace, &[s("foobarbaz"), s("bar"), s("-")]), s("foo-baz"));
        assert_eq!(call(str_replace, &[s("abc"), s(""), s("x")]), s("abc"));
    }

    #[test]
    fn test_rescape() {
        assert_eq!(call(rescape, &[s("abc* (def)")]), s(r"abc\* \(def\)"));
        // Escaped output matches its input literally
        let text = "a=b!<c>:/&~-[x]{1}";
        let Value::Str(escaped) = call(rescape, &[s(text)]) else {
            panic!("Expected Str");
        };
        let re = regex::Regex::new(&format!("^{escaped}$")).unwrap();
        assert!(re.is_match(text));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(call(sanitize, &[s("&lt;b&gt; &amp; &#65;")]), s("<b> & A"));
    }

    #[test]
    fn test_contains_family() {
        assert_eq!(call(contains_any, &[s("foobar"), s("x"), s("bar")]), Value::Bool(true));
        assert_eq!(call(contains_any, &[s("foobar"), s("")]), Value::Bool(false));
        assert_eq!(call(contains_all, &[s("foobar"), s("foo"), s("bar")]), Value::Bool(true));
        assert_eq!(call(contains_all, &[s("foobar"), s("foo"), s("baz")]), Value::Bool(false));
    }

    #[test]
    fn test_ccnorm_contains() {
        assert_eq!(call(ccnorm_contains_any, &[s("V1agra"), s("via")]), Value::Bool(true));
        assert_eq!(call(ccnorm_contains_all, &[s("h3llo w0rld"), s("hello"), s("world")]), Value::Bool(true));
    }

    #[test]
    fn test_equals_to_any_is_strict() {
        assert_eq!(call(equals_to_any, &[Value::Int(1), s("1"), Value::Int(1)]), Value::Bool(true));
        assert_eq!(call(equals_to_any, &[Value::Int(1), s("1"), Value::Float(1.0)]), Value::Bool(false));
    }

    #[test]
    fn test_contains_operator_helper() {
        assert!(contains(&s("hello"), &s("ell")).unwrap());
        assert!(!contains(&s("hello"), &s("")).unwrap());
        assert!(contains(&Value::Int(12345), &Value::Int(34)).unwrap());
    }
}
