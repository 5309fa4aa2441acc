//! `RegExp` on top of the `regex` crate.
//!
//! Patterns are handed to `regex` as written, so constructs it does not
//! support (look-around, back-references) are syntax errors here. The `i`,
//! `m` and `s` flags map to inline flags; `g` and `y` are handled by the
//! match loop through `lastIndex`, which counts characters, not bytes.

use std::rc::Rc;

use regex::Regex;

use super::{constructor, methods};
use crate::errors::{syntax_error, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{Args, Obj, ObjectKind, RegExpData, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().regexp_prototype.clone();
    let ctor = constructor(realm, "RegExp", 2, &proto, regexp);
    methods(
        realm,
        &proto,
        &[("exec", 1, exec), ("test", 1, test), ("toString", 0, to_string)],
    );
    realm.add_global("RegExp", ctor);
}

/// Build a `RegExp` object, as for a `/pattern/flags` literal.
pub(crate) fn new_regexp(realm: &Realm, pattern: &str, flags: &str) -> Result<Obj, EvalError> {
    let mut inline = String::new();
    for (i, flag) in flags.char_indices() {
        if !"gimsuy".contains(flag) || flags[..i].contains(flag) {
            return Err(syntax_error(format!(
                "Invalid regular expression flags '{flags}'"
            )));
        }
        if "ims".contains(flag) {
            inline.push(flag);
        }
    }
    let translated = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    let regex = Regex::new(&translated).map_err(|err| {
        syntax_error(format!("Invalid regular expression: /{pattern}/: {err}"))
    })?;
    let data = RegExpData {
        source: pattern.into(),
        flags: flags.into(),
        regex,
    };
    let obj = Obj::with_kind(
        ObjectKind::RegExp(Rc::new(data)),
        Some(realm.intrinsics().regexp_prototype.clone()),
    );
    obj.set("lastIndex", 0.0)?;
    obj.set("source", pattern)?;
    obj.set("flags", flags)?;
    obj.set("global", flags.contains('g'))?;
    Ok(obj)
}

/// One match, with character offsets into the subject.
pub(super) struct Match {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub groups: Vec<Option<String>>,
    pub named: Vec<(String, Option<String>)>,
}

fn char_offset(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}

fn to_match(re: &Regex, s: &str, caps: &regex::Captures<'_>) -> Option<Match> {
    let whole = caps.get(0)?;
    Some(Match {
        start: char_offset(s, whole.start()),
        end: char_offset(s, whole.end()),
        text: whole.as_str().to_string(),
        groups: caps
            .iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect(),
        named: re
            .capture_names()
            .flatten()
            .map(|name| (name.to_string(), caps.name(name).map(|m| m.as_str().to_string())))
            .collect(),
    })
}

/// Every non-overlapping match, ignoring `lastIndex`.
pub(super) fn all_matches(re: &RegExpData, s: &str) -> Vec<Match> {
    re.regex
        .captures_iter(s)
        .filter_map(|caps| to_match(&re.regex, s, &caps))
        .collect()
}

/// The first match at or after character `from`.
pub(super) fn first_match(re: &RegExpData, s: &str, from: usize) -> Option<Match> {
    let caps = re.regex.captures_at(s, byte_offset(s, from))?;
    to_match(&re.regex, s, &caps)
}

/// `RegExpExec`: match honouring and updating `lastIndex` for global and
/// sticky patterns.
pub(super) fn exec_raw(interp: &Interp, obj: &Obj, s: &str) -> Result<Option<Match>, EvalError> {
    let re = obj
        .regexp()
        .ok_or_else(|| type_error("RegExp method called on incompatible receiver"))?;
    let tracks_index = re.global() || re.sticky();
    let from = if tracks_index {
        obj.get("lastIndex").to_integer().max(0.0) as usize
    } else {
        0
    };
    let len = s.chars().count();
    let found = if from > len {
        None
    } else {
        first_match(&re, s, from).filter(|m| !re.sticky() || m.start == from)
    };
    if tracks_index {
        let next = found.as_ref().map_or(0, |m| m.end);
        interp.set_member(obj, "lastIndex".into(), Value::from(next))?;
    }
    Ok(found)
}

/// The array `exec` and non-global `match` return.
pub(super) fn match_array(interp: &Interp, m: Match, input: &str) -> Result<Value, EvalError> {
    let realm = interp.realm();
    let mut items = vec![Value::from(m.text)];
    items.extend(m.groups.into_iter().map(Value::from));
    let array = realm.new_array(items);
    array.set("index", m.start)?;
    array.set("input", input)?;
    let groups = if m.named.is_empty() {
        Value::Undefined
    } else {
        let groups = realm.new_object();
        for (name, value) in m.named {
            groups.set(&name, value)?;
        }
        Value::Object(groups)
    };
    array.set("groups", groups)?;
    Ok(Value::Object(array))
}

fn regexp(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let flags = args.get(1);
    let (pattern, flags) = match args.get(0).as_object().and_then(Obj::regexp) {
        Some(re) => {
            let flags = match flags {
                Value::Undefined => re.flags.clone(),
                other => other.to_js_string(),
            };
            (re.source.clone(), flags)
        }
        None => match args.get(0) {
            Value::Undefined => ("(?:)".into(), flags_arg(&flags)),
            pattern => (pattern.to_js_string(), flags_arg(&flags)),
        },
    };
    new_regexp(interp.realm(), &pattern, &flags).map(Value::Object)
}

fn flags_arg(flags: &Value) -> Rc<str> {
    match flags {
        Value::Undefined => "".into(),
        other => other.to_js_string(),
    }
}

fn this_regexp<'a>(args: &'a Args<'_>, method: &str) -> Result<&'a Obj, EvalError> {
    match &args.this {
        Value::Object(obj) if obj.regexp().is_some() => Ok(obj),
        _ => Err(type_error(format!(
            "RegExp.prototype.{method} called on incompatible receiver"
        ))),
    }
}

fn exec(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = this_regexp(args, "exec")?;
    let input = args.get(0).to_js_string();
    match exec_raw(interp, obj, &input)? {
        Some(m) => match_array(interp, m, &input),
        None => Ok(Value::Null),
    }
}

fn test(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = this_regexp(args, "test")?;
    let input = args.get(0).to_js_string();
    Ok(Value::Bool(exec_raw(interp, obj, &input)?.is_some()))
}

fn to_string(_: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = this_regexp(args, "toString")?;
    Ok(Value::from(Value::Object(obj.clone()).to_js_string()))
}
