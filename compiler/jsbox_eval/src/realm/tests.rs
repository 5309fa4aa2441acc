use super::*;
use pretty_assertions::assert_eq;

#[test]
fn intrinsic_prototypes_have_type_names() {
    let realm = Realm::new();
    let names: Vec<Rc<str>> = realm
        .intrinsics()
        .prototypes()
        .into_iter()
        .map(|proto| realm.type_name(proto))
        .collect();
    assert_eq!(&*names[2], "Array");
    assert_eq!(&*names[13], "SandboxGlobal");
}

#[test]
fn user_prototypes_are_named_after_their_constructor() {
    let realm = Realm::new();
    let proto = realm.new_object();
    let ctor = realm.native_function("Point", 0, |_, _| Ok(Value::Undefined));
    proto.set("constructor", ctor).unwrap_or_default();
    assert_eq!(&*realm.type_name(&proto), "Point");
    assert_eq!(&*realm.type_name(&realm.new_object()), "Object");
}

#[test]
fn lookup_reports_the_owning_prototype() {
    let realm = Realm::new();
    let array = Value::Object(realm.new_array(vec![Value::from(1.0)]));
    let (_, owner) = realm.lookup(&array, "map").unwrap_or_default();
    let owner = owner.map(|owner| owner.ptr_eq(&realm.intrinsics().array_prototype));
    assert_eq!(owner, Some(true));

    let (length, owner) = realm.lookup(&array, "length").unwrap_or_default();
    assert_eq!(length, Value::from(1.0));
    assert!(owner.is_none());
}

#[test]
fn strings_expose_length_and_indices_as_own() {
    let realm = Realm::new();
    let s = Value::from("héllo");
    assert_eq!(realm.get(&s, "length"), Ok(Value::from(5.0)));
    assert_eq!(realm.get(&s, "1"), Ok(Value::from("é")));
    let (_, owner) = realm.lookup(&s, "slice").unwrap_or_default();
    assert!(owner.is_some_and(|owner| owner.ptr_eq(&realm.intrinsics().string_prototype)));
}

#[test]
fn reading_from_nullish_fails() {
    let realm = Realm::new();
    let err = realm.get(&Value::Null, "x");
    assert!(err.is_err());
}

#[test]
fn errors_pick_their_prototype_by_name() {
    let realm = Realm::new();
    let error = realm.new_error("RangeError", "too big");
    assert!(error.inherits_from(&realm.intrinsics().range_error_prototype));
    assert_eq!(error.get("message"), Value::from("too big"));
    assert_eq!(error.get("name"), Value::from("RangeError"));

    let custom = realm.new_error("QuotaError", "spent");
    assert!(custom.proto().is_some_and(|p| p.ptr_eq(&realm.intrinsics().error_prototype)));
    assert_eq!(custom.get("name"), Value::from("QuotaError"));
}

#[test]
fn array_mutators_are_registered() {
    let realm = Realm::new();
    let proto = &realm.intrinsics().array_prototype;
    let Value::Object(push) = proto.get("push") else {
        panic!("push missing");
    };
    let Value::Object(map) = proto.get("map") else {
        panic!("map missing");
    };
    assert_eq!(realm.array_mutator(&push), Some("push"));
    assert_eq!(realm.array_mutator(&map), None);
}

#[test]
fn standard_globals_include_the_unrestricted_function() {
    let realm = Realm::new();
    let function = realm
        .standard_globals()
        .iter()
        .find(|(name, _)| &**name == "Function")
        .map(|(_, value)| value.clone());
    assert_eq!(
        function,
        Some(Value::Object(realm.intrinsics().function_constructor.clone()))
    );
    assert!(!realm
        .intrinsics()
        .function_constructor
        .ptr_eq(&realm.intrinsics().sandboxed_function));
}

#[test]
fn debug_output_lists_the_standard_globals() {
    let rendered = format!("{:?}", Realm::new());
    assert!(rendered.starts_with("Realm {"), "{rendered}");
    assert!(rendered.contains("\"Math\""), "{rendered}");
    let context = format!("{:?}", crate::Context::standard());
    assert!(context.contains("realm: Realm {"), "{context}");
}
