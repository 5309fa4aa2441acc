#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

fn array(items: Vec<Value>) -> Value {
    Value::Object(Obj::with_kind(ObjectKind::Array(items), None))
}

#[test]
fn typeof_names() {
    assert_eq!(Value::Undefined.type_of(), "undefined");
    assert_eq!(Value::Null.type_of(), "object");
    assert_eq!(Value::from("a").type_of(), "string");
    assert_eq!(array(vec![]).type_of(), "object");
}

#[test]
fn truthiness() {
    assert!(!Value::from(0.0).truthy());
    assert!(!Value::from(f64::NAN).truthy());
    assert!(!Value::from("").truthy());
    assert!(Value::from("0").truthy());
    assert!(array(vec![]).truthy());
}

#[test]
fn arrays_stringify_by_joining() {
    let nested = array(vec![Value::from(1.0), array(vec![Value::from(2.0), Value::Null])]);
    assert_eq!(&*nested.to_js_string(), "1,2,");
    assert_eq!(array(vec![Value::from(5.0)]).to_number(), 5.0);
    assert!(array(vec![Value::from(1.0), Value::from(2.0)]).to_number().is_nan());
}

#[test]
fn self_referencing_array_does_not_recurse_forever() {
    let obj = Obj::with_kind(ObjectKind::Array(vec![Value::from(1.0)]), None);
    obj.set("1", Value::Object(obj.clone())).unwrap();
    assert_eq!(&*Value::Object(obj).to_js_string(), "1,");
}

#[test]
fn loose_and_strict_equality() {
    assert!(Value::Null.loose_equals(&Value::Undefined));
    assert!(!Value::Null.loose_equals(&Value::from(0.0)));
    assert!(Value::from("1").loose_equals(&Value::from(1.0)));
    assert!(Value::from(true).loose_equals(&Value::from(1.0)));
    assert!(!Value::from("1").strict_equals(&Value::from(1.0)));
    assert!(!Value::from(f64::NAN).strict_equals(&Value::from(f64::NAN)));
    assert!(Value::from(f64::NAN).same_value_zero(&Value::from(f64::NAN)));
    assert!(Value::from(0.0).strict_equals(&Value::from(-0.0)));
}

#[test]
fn objects_compare_by_identity() {
    let a = Obj::with_kind(ObjectKind::Ordinary, None);
    let b = Obj::with_kind(ObjectKind::Ordinary, None);
    assert!(Value::Object(a.clone()).strict_equals(&Value::Object(a.clone())));
    assert!(!Value::Object(a).strict_equals(&Value::Object(b)));
}

#[test]
fn array_length_is_virtual() {
    let obj = Obj::with_kind(ObjectKind::Array(vec![Value::from(1.0)]), None);
    obj.set("3", "x").unwrap();
    assert_eq!(obj.get_own("length"), Some(Value::from(4.0)));
    assert_eq!(obj.get_own("1"), Some(Value::Undefined));
    obj.set("length", 1.0).unwrap();
    assert_eq!(obj.array_items(), Some(vec![Value::from(1.0)]));
    assert!(obj.set("length", -1.0).is_err());
}

#[test]
fn array_growth_is_capped() {
    let obj = Obj::with_kind(ObjectKind::Array(Vec::new()), None);
    let huge = MAX_ARRAY_LENGTH.to_string();
    assert!(obj.set(&huge, 1.0).is_err());
    assert!(obj.set("length", f64::from(u32::MAX)).is_err());
    assert_eq!(obj.array_items(), Some(Vec::new()));
    assert_eq!(array_length(3.0).unwrap(), 3);
    assert!(array_length(0.5).is_err());
}

#[test]
fn defined_members_are_plain_own_properties() {
    let obj = Obj::with_kind(ObjectKind::Ordinary, None);
    obj.define("name", "first");
    obj.define("length", 2.0);
    obj.define("name", "second");
    assert_eq!(obj.get_own("name"), Some(Value::from("second")));
    let keys: Vec<String> = obj.own_keys().iter().map(ToString::to_string).collect();
    assert_eq!(keys, ["name", "length"]);
}

#[test]
fn integer_keys_enumerate_first() {
    let obj = Obj::with_kind(ObjectKind::Ordinary, None);
    obj.set("b", 1.0).unwrap();
    obj.set("2", 1.0).unwrap();
    obj.set("a", 1.0).unwrap();
    obj.set("1", 1.0).unwrap();
    let keys: Vec<String> = obj.own_keys().iter().map(ToString::to_string).collect();
    assert_eq!(keys, ["1", "2", "b", "a"]);
    assert!(obj.delete("b"));
    assert_eq!(obj.own_keys().len(), 3);
}

#[test]
fn lookup_reports_owning_prototype() {
    let proto = Obj::with_kind(ObjectKind::Ordinary, None);
    proto.set("greet", "hi").unwrap();
    let child = Obj::with_kind(ObjectKind::Ordinary, Some(proto.clone()));
    let (value, owner) = child.lookup("greet").unwrap();
    assert_eq!(value, Value::from("hi"));
    assert!(owner.unwrap().ptr_eq(&proto));
    assert!(child.inherits_from(&proto));
    assert_eq!(child.get("missing"), Value::Undefined);
}

#[test]
fn canonical_array_indices() {
    assert_eq!(array_index("0"), Some(0));
    assert_eq!(array_index("42"), Some(42));
    assert_eq!(array_index("01"), None);
    assert_eq!(array_index("-1"), None);
    assert_eq!(array_index("1.5"), None);
}
