//! `String` and `String.prototype`. Indices count characters.

use super::regexp::{all_matches, exec_raw, first_match, match_array, new_regexp, Match};
use super::{constructor, methods, relative_index};
use crate::errors::{invalid_string_length, range_error, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{check_string_length, to_uint32, Args, Obj, ObjectKind, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().string_prototype.clone();
    let ctor = constructor(realm, "String", 1, &proto, string);
    methods(realm, &ctor, &[("fromCharCode", 1, from_char_code)]);
    methods(
        realm,
        &proto,
        &[
            ("charAt", 1, char_at),
            ("charCodeAt", 1, char_code_at),
            ("codePointAt", 1, char_code_at),
            ("at", 1, at),
            ("indexOf", 1, index_of),
            ("lastIndexOf", 1, last_index_of),
            ("includes", 1, includes),
            ("startsWith", 1, starts_with),
            ("endsWith", 1, ends_with),
            ("slice", 2, slice),
            ("substring", 2, substring),
            ("substr", 2, substr),
            ("toUpperCase", 0, to_upper_case),
            ("toLowerCase", 0, to_lower_case),
            ("trim", 0, trim),
            ("trimStart", 0, trim_start),
            ("trimEnd", 0, trim_end),
            ("padStart", 2, pad_start),
            ("padEnd", 2, pad_end),
            ("repeat", 1, repeat),
            ("concat", 1, concat),
            ("split", 2, split),
            ("replace", 2, replace),
            ("replaceAll", 2, replace_all),
            ("match", 1, match_),
            ("search", 1, search),
            ("toString", 0, value_of),
            ("valueOf", 0, value_of),
        ],
    );
    realm.add_global("String", ctor);
}

fn string(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = if args.is_empty() {
        Value::from("")
    } else {
        Value::String(args.get(0).to_js_string())
    };
    if args.construct {
        return Ok(Value::Object(Obj::with_kind(
            ObjectKind::Boxed(s),
            Some(interp.realm().intrinsics().string_prototype.clone()),
        )));
    }
    Ok(s)
}

fn from_char_code(_: &Interp, args: &Args<'_>) -> EvalResult {
    let units: Vec<u16> = args
        .values
        .iter()
        .map(|v| (to_uint32(v.to_number()) & 0xFFFF) as u16)
        .collect();
    Ok(Value::from(String::from_utf16_lossy(&units)))
}

/// `this` coerced to a string; `null` and `undefined` are rejected.
fn this_string(args: &Args<'_>, method: &str) -> Result<String, EvalError> {
    match &args.this {
        Value::Undefined | Value::Null => Err(type_error(format!(
            "String.prototype.{method} called on null or undefined"
        ))),
        this => Ok(this.to_js_string().to_string()),
    }
}

fn chars(args: &Args<'_>, method: &str) -> Result<Vec<char>, EvalError> {
    Ok(this_string(args, method)?.chars().collect())
}

fn collect(chars: &[char]) -> Value {
    Value::from(chars.iter().collect::<String>())
}

fn char_at(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "charAt")?;
    let index = args.get(0).to_integer();
    Ok(match usize_index(index).and_then(|i| chars.get(i)) {
        Some(c) => Value::from(c.to_string()),
        None => Value::from(""),
    })
}

fn char_code_at(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "charCodeAt")?;
    let index = args.get(0).to_integer();
    Ok(match usize_index(index).and_then(|i| chars.get(i)) {
        Some(c) => Value::from(u32::from(*c)),
        None => Value::Number(f64::NAN),
    })
}

fn usize_index(n: f64) -> Option<usize> {
    (n >= 0.0).then_some(n as usize)
}

fn at(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "at")?;
    let n = args.get(0).to_integer();
    let index = if n < 0.0 { chars.len() as f64 + n } else { n };
    Ok(usize_index(index)
        .and_then(|i| chars.get(i))
        .map_or(Value::Undefined, |c| Value::from(c.to_string())))
}

/// Character index of `needle` in `hay` at or after `from`.
fn find_chars(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(hay.len()));
    }
    (from..=hay.len().saturating_sub(needle.len()))
        .find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

fn index_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    let hay = chars(args, "indexOf")?;
    let needle: Vec<char> = args.get(0).to_js_string().chars().collect();
    let from = args.get(1).to_integer().max(0.0) as usize;
    Ok(Value::Number(
        find_chars(&hay, &needle, from).map_or(-1.0, |i| i as f64),
    ))
}

fn last_index_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    let hay = chars(args, "lastIndexOf")?;
    let needle: Vec<char> = args.get(0).to_js_string().chars().collect();
    if needle.len() > hay.len() {
        return Ok(Value::Number(-1.0));
    }
    let found = (0..=hay.len() - needle.len())
        .rev()
        .find(|&i| hay[i..i + needle.len()] == needle[..]);
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn reject_regexp(value: &Value, method: &str) -> Result<(), EvalError> {
    if value.as_object().and_then(Obj::regexp).is_some() {
        return Err(type_error(format!(
            "First argument to String.prototype.{method} must not be a regular expression"
        )));
    }
    Ok(())
}

fn includes(_: &Interp, args: &Args<'_>) -> EvalResult {
    reject_regexp(&args.get(0), "includes")?;
    let hay = chars(args, "includes")?;
    let needle: Vec<char> = args.get(0).to_js_string().chars().collect();
    let from = args.get(1).to_integer().max(0.0) as usize;
    Ok(Value::Bool(find_chars(&hay, &needle, from).is_some()))
}

fn starts_with(_: &Interp, args: &Args<'_>) -> EvalResult {
    reject_regexp(&args.get(0), "startsWith")?;
    let hay = chars(args, "startsWith")?;
    let needle: Vec<char> = args.get(0).to_js_string().chars().collect();
    let from = relative_index(&args.get(1), hay.len(), 0).min(hay.len());
    Ok(Value::Bool(hay[from..].starts_with(&needle)))
}

fn ends_with(_: &Interp, args: &Args<'_>) -> EvalResult {
    reject_regexp(&args.get(0), "endsWith")?;
    let hay = chars(args, "endsWith")?;
    let needle: Vec<char> = args.get(0).to_js_string().chars().collect();
    let end = match args.get(1) {
        Value::Undefined => hay.len(),
        v => (v.to_integer().max(0.0) as usize).min(hay.len()),
    };
    Ok(Value::Bool(hay[..end].ends_with(&needle)))
}

fn slice(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "slice")?;
    let start = relative_index(&args.get(0), chars.len(), 0);
    let end = relative_index(&args.get(1), chars.len(), chars.len());
    Ok(collect(chars.get(start..end.max(start)).unwrap_or_default()))
}

fn substring(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "substring")?;
    let clamp = |v: Value, default: usize| match v {
        Value::Undefined => default,
        v => (v.to_integer().max(0.0) as usize).min(chars.len()),
    };
    let a = clamp(args.get(0), 0);
    let b = clamp(args.get(1), chars.len());
    Ok(collect(&chars[a.min(b)..a.max(b)]))
}

fn substr(_: &Interp, args: &Args<'_>) -> EvalResult {
    let chars = chars(args, "substr")?;
    let start = relative_index(&args.get(0), chars.len(), 0);
    let count = match args.get(1) {
        Value::Undefined => chars.len() - start,
        v => (v.to_integer().max(0.0) as usize).min(chars.len() - start),
    };
    Ok(collect(&chars[start..start + count]))
}

fn to_upper_case(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::from(this_string(args, "toUpperCase")?.to_uppercase()))
}

fn to_lower_case(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::from(this_string(args, "toLowerCase")?.to_lowercase()))
}

fn trim(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::from(this_string(args, "trim")?.trim()))
}

fn trim_start(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::from(this_string(args, "trimStart")?.trim_start()))
}

fn trim_end(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::from(this_string(args, "trimEnd")?.trim_end()))
}

fn padding(args: &Args<'_>, method: &str) -> Result<(String, String), EvalError> {
    let s = this_string(args, method)?;
    let target = args.get(0).to_integer().max(0.0) as usize;
    let filler: Vec<char> = match args.get(1) {
        Value::Undefined => vec![' '],
        v => v.to_js_string().chars().collect(),
    };
    let len = s.chars().count();
    if target <= len || filler.is_empty() {
        return Ok((s, String::new()));
    }
    check_string_length(target.saturating_mul(filler.iter().map(|c| c.len_utf8()).max().unwrap_or(1)))?;
    let pad = filler.iter().cycle().take(target - len).collect();
    Ok((s, pad))
}

fn pad_start(_: &Interp, args: &Args<'_>) -> EvalResult {
    let (s, pad) = padding(args, "padStart")?;
    Ok(Value::from(pad + &s))
}

fn pad_end(_: &Interp, args: &Args<'_>) -> EvalResult {
    let (s, pad) = padding(args, "padEnd")?;
    Ok(Value::from(s + &pad))
}

fn repeat(_: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "repeat")?;
    let count = args.get(0).to_integer();
    if count < 0.0 || count.is_infinite() {
        return Err(range_error(format!("Invalid count value: {}", args.get(0))));
    }
    if count > 0.0 && s.len() as f64 * count > crate::value::MAX_STRING_LENGTH as f64 {
        return Err(invalid_string_length());
    }
    Ok(Value::from(s.repeat(count as usize)))
}

fn concat(_: &Interp, args: &Args<'_>) -> EvalResult {
    let mut s = this_string(args, "concat")?;
    for value in args.values {
        s.push_str(&value.to_js_string());
        check_string_length(s.len())?;
    }
    Ok(Value::from(s))
}

fn value_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    match &args.this {
        s @ Value::String(_) => Ok(s.clone()),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Boxed(s @ Value::String(_)) => Ok(s.clone()),
            _ => Err(type_error("String.prototype.valueOf requires that 'this' be a String")),
        },
        _ => Err(type_error("String.prototype.valueOf requires that 'this' be a String")),
    }
}

fn split(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "split")?;
    let limit = match args.get(1) {
        Value::Undefined => usize::MAX,
        v => to_uint32(v.to_number()) as usize,
    };
    let separator = args.get(0);
    let mut parts: Vec<Value> = if let Some(re) = separator.as_object().and_then(Obj::regexp) {
        let mut parts = Vec::new();
        let mut last = 0;
        let mut from = 0;
        let len = s.chars().count();
        if len == 0 {
            if first_match(&re, &s, 0).is_none() {
                parts.push(Value::from(""));
            }
        } else {
            while from < len {
                let Some(m) = first_match(&re, &s, from) else {
                    break;
                };
                if m.start >= len {
                    break;
                }
                if m.end == last {
                    from = m.start + 1;
                    continue;
                }
                parts.push(Value::from(char_slice(&s, last, m.start)));
                parts.extend(m.groups.into_iter().map(Value::from));
                last = m.end;
                from = last;
            }
            parts.push(Value::from(char_slice(&s, last, len)));
        }
        parts
    } else {
        match separator {
            Value::Undefined => vec![Value::from(s)],
            sep => {
                let sep = sep.to_js_string();
                if sep.is_empty() {
                    s.chars().map(|c| Value::from(c.to_string())).collect()
                } else {
                    s.split(&*sep).map(Value::from).collect()
                }
            }
        }
    };
    parts.truncate(limit);
    Ok(Value::Object(interp.realm().new_array(parts)))
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Expand `$&`, `$1`..`$99`, `` $` ``, `$'` and `$$` in a replacement string.
fn expand(template: &str, m: &Match, subject: &str) -> Result<String, EvalError> {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        check_string_length(out.len())?;
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(&m.text);
            }
            Some('`') => {
                chars.next();
                out.push_str(&char_slice(subject, 0, m.start));
            }
            Some('\'') => {
                chars.next();
                out.extend(subject.chars().skip(m.end));
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let mut index = d.to_digit(10).unwrap_or(0) as usize;
                if let Some(d2) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two = index * 10 + d2 as usize;
                    if two >= 1 && two <= m.groups.len() {
                        chars.next();
                        index = two;
                    }
                }
                match m.groups.get(index.wrapping_sub(1)) {
                    Some(group) if index >= 1 => out.push_str(group.as_deref().unwrap_or("")),
                    _ => {
                        out.push('$');
                        out.push(d);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    check_string_length(out.len())?;
    Ok(out)
}

/// Substitute `matches` in `subject` using a replacement string or function.
fn substitute(interp: &Interp, subject: &str, matches: Vec<Match>, replacement: &Value) -> EvalResult {
    let mut out = String::new();
    let mut last = 0;
    for m in matches {
        out.push_str(&char_slice(subject, last, m.start));
        let text = if replacement.is_callable() {
            let mut call_args = vec![Value::from(m.text.clone())];
            call_args.extend(m.groups.iter().cloned().map(Value::from));
            call_args.push(Value::from(m.start));
            call_args.push(Value::from(subject));
            interp
                .call(replacement, Value::Undefined, &call_args)?
                .to_js_string()
                .to_string()
        } else {
            expand(&replacement.to_js_string(), &m, subject)?
        };
        out.push_str(&text);
        check_string_length(out.len())?;
        last = m.end;
    }
    out.extend(subject.chars().skip(last));
    Ok(Value::from(out))
}

fn literal_matches(subject: &str, needle: &str, all: bool) -> Vec<Match> {
    let hay: Vec<char> = subject.chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    let mut matches = Vec::new();
    let mut from = 0;
    while let Some(start) = find_chars(&hay, &needle_chars, from) {
        matches.push(Match {
            start,
            end: start + needle_chars.len(),
            text: needle.to_string(),
            groups: Vec::new(),
            named: Vec::new(),
        });
        if !all {
            break;
        }
        from = start + needle_chars.len().max(1);
        if from > hay.len() {
            break;
        }
    }
    matches
}

fn replace(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "replace")?;
    let pattern = args.get(0);
    let matches = match pattern.as_object() {
        Some(obj) if obj.regexp().is_some() => regexp_matches(interp, obj, &s)?,
        _ => literal_matches(&s, &pattern.to_js_string(), false),
    };
    substitute(interp, &s, matches, &args.get(1))
}

fn replace_all(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "replaceAll")?;
    let pattern = args.get(0);
    let matches = match pattern.as_object() {
        Some(obj) if obj.regexp().is_some_and(|re| !re.global()) => {
            return Err(type_error(
                "replaceAll must be called with a global RegExp",
            ))
        }
        Some(obj) if obj.regexp().is_some() => regexp_matches(interp, obj, &s)?,
        _ => literal_matches(&s, &pattern.to_js_string(), true),
    };
    substitute(interp, &s, matches, &args.get(1))
}

/// Matches a `replace` with a regular expression acts on: all of them for
/// a global pattern, else the single `exec` result.
fn regexp_matches(interp: &Interp, obj: &Obj, s: &str) -> Result<Vec<Match>, EvalError> {
    let Some(re) = obj.regexp() else {
        return Ok(Vec::new());
    };
    if re.global() {
        interp.set_member(obj, "lastIndex".into(), Value::from(0.0))?;
        return Ok(all_matches(&re, s));
    }
    Ok(exec_raw(interp, obj, s)?.into_iter().collect())
}

fn to_regexp(interp: &Interp, value: &Value) -> Result<Obj, EvalError> {
    match value.as_object() {
        Some(obj) if obj.regexp().is_some() => Ok(obj.clone()),
        _ => {
            let pattern = match value {
                Value::Undefined => "(?:)".into(),
                other => other.to_js_string(),
            };
            new_regexp(interp.realm(), &pattern, "")
        }
    }
}

fn match_(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "match")?;
    let obj = to_regexp(interp, &args.get(0))?;
    let Some(re) = obj.regexp() else {
        return Ok(Value::Null);
    };
    if !re.global() {
        return match exec_raw(interp, &obj, &s)? {
            Some(m) => match_array(interp, m, &s),
            None => Ok(Value::Null),
        };
    }
    interp.set_member(&obj, "lastIndex".into(), Value::from(0.0))?;
    let found: Vec<Value> = all_matches(&re, &s)
        .into_iter()
        .map(|m| Value::from(m.text))
        .collect();
    if found.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Object(interp.realm().new_array(found)))
}

fn search(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let s = this_string(args, "search")?;
    let obj = to_regexp(interp, &args.get(0))?;
    let found = obj.regexp().and_then(|re| first_match(&re, &s, 0));
    Ok(Value::Number(found.map_or(-1.0, |m| m.start as f64)))
}
