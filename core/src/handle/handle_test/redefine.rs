use crate::error::{ErrorKind, kind_of};
use crate::handle::HandleKind;
use crate::handle::combinators::filter_return_value;

use super::*;

fn unit_int() -> MethodType {
    MethodType::method_type(JType::Int, vec![])
}

fn versioned(name: &str) -> ClassRef {
    ClassBuilder::new(name)
        .method("answer", unit_int(), ACC_PUBLIC | ACC_STATIC, |_| Ok(Value::Int(1)))
        .method("label", unit_int(), ACC_PUBLIC | ACC_FINAL, |_| Ok(Value::Int(10)))
        .method("speed", unit_int(), ACC_PUBLIC, |_| Ok(Value::Int(100)))
        .build()
}

#[test]
fn static_handles_follow_a_redefinition() {
    let class = versioned("demo/redefine/Static");
    let answer = Lookup::new(&class).find_static(&class, "answer", &unit_int()).unwrap();
    let negated = filter_return_value(&answer, &op("neg", &ints(1))).unwrap();
    assert_eq!(call(&answer, vec![]), Value::Int(1));
    assert_eq!(call(&negated, vec![]), Value::Int(-1));
    let before = answer.identity();

    class
        .redefine_method("answer", &unit_int(), |_| Ok(Value::Int(2)))
        .unwrap();
    assert_eq!(answer.identity(), before);
    assert_eq!(answer.method_type(), &unit_int());
    assert_eq!(call(&answer, vec![]), Value::Int(2));
    assert_eq!(call(&negated, vec![]), Value::Int(-2));
    assert_eq!(class.generation(), 1);
}

#[test]
fn instance_handles_follow_a_redefinition() {
    let class = versioned("demo/redefine/Instance");
    let lookup = Lookup::new(&class);
    let label = lookup.find_virtual(&class, "label", &unit_int()).unwrap();
    assert_eq!(label.kind(), HandleKind::Special);
    let speed = lookup.find_virtual(&class, "speed", &unit_int()).unwrap();
    assert_eq!(speed.kind(), HandleKind::Virtual);

    let receiver = Value::object(ObjRef::new_instance(&class));
    let bound_label = label.bind_to(receiver.clone()).unwrap();
    let bound_speed = speed.bind_to(receiver).unwrap();
    assert_eq!(call(&bound_label, vec![]), Value::Int(10));
    assert_eq!(call(&bound_speed, vec![]), Value::Int(100));

    class.redefine_method("label", &unit_int(), |_| Ok(Value::Int(20))).unwrap();
    class.redefine_method("speed", &unit_int(), |_| Ok(Value::Int(200))).unwrap();
    assert_eq!(call(&bound_label, vec![]), Value::Int(20));
    assert_eq!(call(&bound_speed, vec![]), Value::Int(200));
    assert!(class.handle_cache().live_handles() >= 2);
}

#[test]
fn subclasses_see_an_inherited_redefinition() {
    let base = versioned("demo/redefine/Base");
    let derived = ClassBuilder::new("demo/redefine/Derived").extends(&base).build();
    let speed = Lookup::new(&base).find_virtual(&base, "speed", &unit_int()).unwrap();
    let receiver = Value::object(ObjRef::new_instance(&derived));
    assert_eq!(speed.invoke_exact(speed.method_type(), vec![receiver.clone()]).unwrap(), Value::Int(100));

    base.redefine_method("speed", &unit_int(), |_| Ok(Value::Int(300))).unwrap();
    assert_eq!(speed.invoke_exact(speed.method_type(), vec![receiver]).unwrap(), Value::Int(300));
}

#[test]
fn redefining_a_missing_method_fails() {
    let class = versioned("demo/redefine/Missing");
    let err = class
        .redefine_method("absent", &unit_int(), |_| Ok(Value::Int(0)))
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::NoSuchMember));
    assert_eq!(class.generation(), 0);
}
