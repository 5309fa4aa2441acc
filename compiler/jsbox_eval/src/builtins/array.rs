//! `Array` and `Array.prototype`.

use std::cmp::Ordering;

use super::{callback, constructor, method, methods, relative_index, Native};
use crate::capabilities::ArrayChange;
use crate::errors::{invalid_array_length, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{array_length, check_string_length, Args, Obj, ObjectKind, Value, MAX_ARRAY_LENGTH};

/// Methods that mutate their receiver in place; calls to them produce a
/// change record for `subscribe_change` observers.
const MUTATORS: [(&str, u32, Native); 8] = [
    ("push", 1, push),
    ("pop", 0, pop),
    ("shift", 0, shift),
    ("unshift", 1, unshift),
    ("splice", 2, splice),
    ("reverse", 0, reverse),
    ("sort", 1, sort),
    ("copyWithin", 2, copy_within),
];

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().array_prototype.clone();
    let ctor = constructor(realm, "Array", 1, &proto, array);
    methods(
        realm,
        &ctor,
        &[("isArray", 1, is_array), ("of", 0, of), ("from", 1, from)],
    );
    for (name, length, func) in MUTATORS {
        let function = method(realm, &proto, name, length, func);
        realm.register_array_mutator(&function, name);
    }
    methods(
        realm,
        &proto,
        &[
            ("fill", 1, fill),
            ("concat", 1, concat),
            ("join", 1, join),
            ("slice", 2, slice),
            ("indexOf", 1, index_of),
            ("lastIndexOf", 1, last_index_of),
            ("includes", 1, includes),
            ("find", 1, find),
            ("findIndex", 1, find_index),
            ("findLast", 1, find_last),
            ("findLastIndex", 1, find_last_index),
            ("filter", 1, filter),
            ("map", 1, map),
            ("forEach", 1, for_each),
            ("some", 1, some),
            ("every", 1, every),
            ("reduce", 1, reduce),
            ("reduceRight", 1, reduce_right),
            ("flat", 0, flat),
            ("flatMap", 1, flat_map),
            ("at", 1, at),
            ("toString", 0, to_string),
        ],
    );
    realm.add_global("Array", ctor);
}

/// The change a mutating method call will make to `items`.
pub(crate) fn change_record(method: &'static str, items: &[Value], args: &[Value]) -> ArrayChange {
    let len = items.len();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let (start, end, added, removed) = match method {
        "push" => (len, len + args.len(), args.to_vec(), Vec::new()),
        "pop" => (
            len.saturating_sub(1),
            len,
            Vec::new(),
            items.last().cloned().into_iter().collect(),
        ),
        "shift" => (0, len.min(1), Vec::new(), items.first().cloned().into_iter().collect()),
        "unshift" => (0, args.len(), args.to_vec(), Vec::new()),
        "splice" => {
            let (start, count) = splice_range(len, args);
            let added = args.get(2..).unwrap_or_default().to_vec();
            (
                start,
                start + count,
                added,
                items[start..start + count].to_vec(),
            )
        }
        "copyWithin" => {
            let (target, from, count) = copy_within_range(len, &arg(0), &arg(1), &arg(2));
            let added = items[from..from + count].to_vec();
            let removed = items[target..target + count].to_vec();
            (target, target + count, added, removed)
        }
        // reverse and sort rearrange the whole array
        _ => (0, len, Vec::new(), Vec::new()),
    };
    ArrayChange {
        method,
        start,
        end,
        added,
        removed,
    }
}

fn splice_range(len: usize, args: &[Value]) -> (usize, usize) {
    let start = relative_index(&args.first().cloned().unwrap_or_default(), len, 0);
    let count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => (args[1].to_integer().max(0.0) as usize).min(len - start),
    };
    (start, count)
}

fn copy_within_range(len: usize, target: &Value, start: &Value, end: &Value) -> (usize, usize, usize) {
    let target = relative_index(target, len, 0);
    let from = relative_index(start, len, 0);
    let to = relative_index(end, len, len);
    let count = to.saturating_sub(from).min(len - target);
    (target, from, count)
}

fn this_array<'a>(args: &'a Args<'_>, method: &str) -> Result<&'a Obj, EvalError> {
    match &args.this {
        Value::Object(obj) if obj.is_array() => Ok(obj),
        _ => Err(type_error(format!(
            "Array.prototype.{method} called on a non-array"
        ))),
    }
}

fn items(args: &Args<'_>, method: &str) -> Result<Vec<Value>, EvalError> {
    Ok(this_array(args, method)?.array_items().unwrap_or_default())
}

/// Mutate the receiver's elements after the write check passes.
fn mutate<R>(
    interp: &Interp,
    args: &Args<'_>,
    method: &str,
    f: impl FnOnce(&mut Vec<Value>) -> R,
) -> Result<R, EvalError> {
    let arr = this_array(args, method)?;
    interp.ensure_writable(arr, "length")?;
    let mut data = arr.borrow_mut();
    match &mut data.kind {
        ObjectKind::Array(items) => Ok(f(items)),
        _ => Err(type_error("not an array")),
    }
}

fn new_array(interp: &Interp, items: Vec<Value>) -> EvalResult {
    Ok(Value::Object(interp.realm().new_array(items)))
}

// Constructor and statics

fn array(interp: &Interp, args: &Args<'_>) -> EvalResult {
    if let [Value::Number(n)] = args.values {
        return new_array(interp, vec![Value::Undefined; array_length(*n)?]);
    }
    new_array(interp, args.values.to_vec())
}

fn is_array(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(matches!(args.get(0), Value::Object(obj) if obj.is_array())))
}

fn of(interp: &Interp, args: &Args<'_>) -> EvalResult {
    new_array(interp, args.values.to_vec())
}

fn from(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let source = args.get(0);
    let items: Vec<Value> = match &source {
        Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        Value::Object(obj) => match obj.array_items() {
            Some(items) => items,
            None => {
                let len = array_length(obj.get("length").to_integer().max(0.0))?;
                (0..len).map(|i| obj.get(&i.to_string())).collect()
            }
        },
        Value::Undefined | Value::Null => {
            return Err(type_error(format!("{} is not iterable", source.to_js_string())))
        }
        _ => Vec::new(),
    };
    let items = match args.get(1) {
        Value::Undefined => items,
        _ => {
            let map = callback(args, 1)?;
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(&map, Value::Undefined, &[item, Value::from(i)])?);
            }
            mapped
        }
    };
    new_array(interp, items)
}

// Mutators

fn push(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "push", |items| {
        if items.len() + args.values.len() > MAX_ARRAY_LENGTH {
            return Err(invalid_array_length());
        }
        items.extend_from_slice(args.values);
        Ok(Value::from(items.len()))
    })?
}

fn pop(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "pop", |items| items.pop().unwrap_or_default())
}

fn shift(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "shift", |items| {
        if items.is_empty() {
            Value::Undefined
        } else {
            items.remove(0)
        }
    })
}

fn unshift(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "unshift", |items| {
        if items.len() + args.values.len() > MAX_ARRAY_LENGTH {
            return Err(invalid_array_length());
        }
        items.splice(0..0, args.values.iter().cloned());
        Ok(Value::from(items.len()))
    })?
}

fn splice(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let removed = mutate(interp, args, "splice", |items| {
        let (start, count) = splice_range(items.len(), args.values);
        let added = args.rest(2);
        if items.len() - count + added.len() > MAX_ARRAY_LENGTH {
            return Err(invalid_array_length());
        }
        Ok(items.splice(start..start + count, added.iter().cloned()).collect::<Vec<_>>())
    })??;
    new_array(interp, removed)
}

fn reverse(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "reverse", |items| items.reverse())?;
    Ok(args.this.clone())
}

fn sort(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let compare = match args.get(0) {
        Value::Undefined => None,
        _ => Some(callback(args, 0)?),
    };
    let values = items(args, "sort")?;
    let sorted = merge_sort(values, &mut |a: &Value, b: &Value| match (a, b) {
        (Value::Undefined, Value::Undefined) => Ok(Ordering::Equal),
        (Value::Undefined, _) => Ok(Ordering::Greater),
        (_, Value::Undefined) => Ok(Ordering::Less),
        _ => match &compare {
            Some(compare) => {
                let result = interp.call(compare, Value::Undefined, &[a.clone(), b.clone()])?;
                let n = result.to_number();
                Ok(if n < 0.0 {
                    Ordering::Less
                } else if n > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                })
            }
            None => Ok(a.to_js_string().cmp(&b.to_js_string())),
        },
    })?;
    mutate(interp, args, "sort", |items| *items = sorted)?;
    Ok(args.this.clone())
}

/// Stable merge sort with a fallible comparator. Inconsistent comparators
/// produce an unspecified order, never a panic.
fn merge_sort(
    mut values: Vec<Value>,
    compare: &mut impl FnMut(&Value, &Value) -> Result<Ordering, EvalError>,
) -> Result<Vec<Value>, EvalError> {
    if values.len() <= 1 {
        return Ok(values);
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(values, compare)?;
    let right = merge_sort(right, compare)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare(a, b)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn copy_within(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "copyWithin", |items| {
        let (target, from, count) =
            copy_within_range(items.len(), &args.get(0), &args.get(1), &args.get(2));
        let source = items[from..from + count].to_vec();
        items[target..target + count].clone_from_slice(&source);
    })?;
    Ok(args.this.clone())
}

fn fill(interp: &Interp, args: &Args<'_>) -> EvalResult {
    mutate(interp, args, "fill", |items| {
        let len = items.len();
        let start = relative_index(&args.get(1), len, 0);
        let end = relative_index(&args.get(2), len, len);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = args.get(0);
        }
    })?;
    Ok(args.this.clone())
}

// Accessors

fn concat(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let mut out = items(args, "concat")?;
    for value in args.values {
        match value.as_object().and_then(Obj::array_items) {
            Some(items) => out.extend(items),
            None => out.push(value.clone()),
        }
        if out.len() > MAX_ARRAY_LENGTH {
            return Err(invalid_array_length());
        }
    }
    new_array(interp, out)
}

fn join(_: &Interp, args: &Args<'_>) -> EvalResult {
    let separator = match args.get(0) {
        Value::Undefined => ",".into(),
        sep => sep.to_js_string(),
    };
    let items = items(args, "join")?;
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            other => other.to_js_string().to_string(),
        })
        .collect();
    let separators = separator.len().saturating_mul(parts.len().saturating_sub(1));
    check_string_length(parts.iter().map(String::len).sum::<usize>().saturating_add(separators))?;
    Ok(Value::from(parts.join(&separator)))
}

fn to_string(interp: &Interp, args: &Args<'_>) -> EvalResult {
    join(interp, &Args::new(args.this.clone(), &[]))
}

fn slice(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let items = items(args, "slice")?;
    let len = items.len();
    let start = relative_index(&args.get(0), len, 0);
    let end = relative_index(&args.get(1), len, len);
    new_array(interp, items.get(start..end.max(start)).unwrap_or_default().to_vec())
}

fn index_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    let items = items(args, "indexOf")?;
    let target = args.get(0);
    let from = relative_index(&args.get(1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| item.strict_equals(&target))
        .map_or(-1.0, |(i, _)| i as f64);
    Ok(Value::Number(found))
}

fn last_index_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    let items = items(args, "lastIndexOf")?;
    let target = args.get(0);
    let found = items
        .iter()
        .rposition(|item| item.strict_equals(&target))
        .map_or(-1.0, |i| i as f64);
    Ok(Value::Number(found))
}

fn includes(_: &Interp, args: &Args<'_>) -> EvalResult {
    let items = items(args, "includes")?;
    let target = args.get(0);
    let from = relative_index(&args.get(1), items.len(), 0);
    Ok(Value::Bool(
        items.iter().skip(from).any(|item| item.same_value_zero(&target)),
    ))
}

fn at(_: &Interp, args: &Args<'_>) -> EvalResult {
    let items = items(args, "at")?;
    let n = args.get(0).to_integer();
    let index = if n < 0.0 { items.len() as f64 + n } else { n };
    if index < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(index as usize).cloned().unwrap_or_default())
}

// Iteration

/// Call the callback argument as `(item, index, array)` for each element,
/// stopping early when `visit` returns `Some`.
fn each<T>(
    interp: &Interp,
    args: &Args<'_>,
    method: &str,
    reverse: bool,
    mut visit: impl FnMut(usize, &Value, Value) -> Option<T>,
) -> Result<Option<T>, EvalError> {
    let items = items(args, method)?;
    let f = callback(args, 0)?;
    let this_arg = args.get(1);
    let order: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..items.len()).rev())
    } else {
        Box::new(0..items.len())
    };
    for i in order {
        let item = &items[i];
        let result = interp.call(
            &f,
            this_arg.clone(),
            &[item.clone(), Value::from(i), args.this.clone()],
        )?;
        if let Some(done) = visit(i, item, result) {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn find(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let found = each(interp, args, "find", false, |_, item, r| r.truthy().then(|| item.clone()))?;
    Ok(found.unwrap_or_default())
}

fn find_index(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let found = each(interp, args, "findIndex", false, |i, _, r| r.truthy().then_some(i))?;
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn find_last(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let found = each(interp, args, "findLast", true, |_, item, r| r.truthy().then(|| item.clone()))?;
    Ok(found.unwrap_or_default())
}

fn find_last_index(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let found = each(interp, args, "findLastIndex", true, |i, _, r| r.truthy().then_some(i))?;
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn filter(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let mut kept = Vec::new();
    each::<()>(interp, args, "filter", false, |_, item, r| {
        if r.truthy() {
            kept.push(item.clone());
        }
        None
    })?;
    new_array(interp, kept)
}

fn map(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let mut mapped = Vec::new();
    each::<()>(interp, args, "map", false, |_, _, r| {
        mapped.push(r);
        None
    })?;
    new_array(interp, mapped)
}

fn for_each(interp: &Interp, args: &Args<'_>) -> EvalResult {
    each::<()>(interp, args, "forEach", false, |_, _, _| None)?;
    Ok(Value::Undefined)
}

fn some(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let found = each(interp, args, "some", false, |_, _, r| r.truthy().then_some(()))?;
    Ok(Value::Bool(found.is_some()))
}

fn every(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let failed = each(interp, args, "every", false, |_, _, r| (!r.truthy()).then_some(()))?;
    Ok(Value::Bool(failed.is_none()))
}

fn fold(interp: &Interp, args: &Args<'_>, method: &str, reverse: bool) -> EvalResult {
    let items = items(args, method)?;
    let f = callback(args, 0)?;
    let mut order: Vec<usize> = (0..items.len()).collect();
    if reverse {
        order.reverse();
    }
    let mut order = order.into_iter();
    let mut acc = if args.len() >= 2 {
        args.get(1)
    } else {
        match order.next() {
            Some(i) => items[i].clone(),
            None => return Err(type_error("Reduce of empty array with no initial value")),
        }
    };
    for i in order {
        acc = interp.call(
            &f,
            Value::Undefined,
            &[acc, items[i].clone(), Value::from(i), args.this.clone()],
        )?;
    }
    Ok(acc)
}

fn reduce(interp: &Interp, args: &Args<'_>) -> EvalResult {
    fold(interp, args, "reduce", false)
}

fn reduce_right(interp: &Interp, args: &Args<'_>) -> EvalResult {
    fold(interp, args, "reduceRight", true)
}

fn flatten_into(out: &mut Vec<Value>, items: Vec<Value>, depth: f64) {
    for item in items {
        match item.as_object().and_then(Obj::array_items) {
            Some(inner) if depth >= 1.0 => flatten_into(out, inner, depth - 1.0),
            _ => out.push(item),
        }
    }
}

fn flat(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let depth = match args.get(0) {
        Value::Undefined => 1.0,
        d => d.to_integer(),
    };
    let mut out = Vec::new();
    flatten_into(&mut out, items(args, "flat")?, depth);
    new_array(interp, out)
}

fn flat_map(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let mut mapped = Vec::new();
    each::<()>(interp, args, "flatMap", false, |_, _, r| {
        mapped.push(r);
        None
    })?;
    let mut out = Vec::new();
    flatten_into(&mut out, mapped, 1.0);
    new_array(interp, out)
}
