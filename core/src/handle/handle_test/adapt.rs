use crate::error::{ErrorKind, kind_of};
use crate::handle::HandleKind;
use crate::handle::combinators::{drop_arguments, insert_arguments};
use crate::handle::invokers::{exact_invoker, invoker, spread_invoker};
use crate::handle::support;

use super::*;

fn boxed(value: i32) -> Value {
    Value::Int(value).boxed()
}

fn concat() -> MethodHandle {
    let string = JType::string();
    op("concat", &MethodType::method_type(string.clone(), vec![string.clone(), string]))
}

fn join() -> MethodHandle {
    let string = JType::string();
    op(
        "join",
        &MethodType::method_type(string.clone(), vec![string, JType::of(&string_array())]),
    )
}

#[test]
fn as_type_is_cached_and_identity_is_free() {
    let add = add();
    assert!(add.as_type(&ints(2)).unwrap().ptr_eq(&add));

    let generic = MethodType::generic(2);
    let first = add.as_type(&generic).unwrap();
    assert_eq!(first.kind(), HandleKind::AsType);
    let second = add.as_type(&generic).unwrap();
    assert!(first.ptr_eq(&second));

    let result = first.invoke_exact(&generic, vec![boxed(2), boxed(3)]).unwrap();
    assert!(result.same_value(&boxed(5)));
}

#[test]
fn invoke_converts_where_as_type_allows() {
    let widened = MethodType::method_type(JType::Long, vec![JType::Short, JType::Byte]);
    assert_eq!(add().invoke(&widened, vec![Value::Short(2), Value::Byte(3)]).unwrap(), Value::Long(5));

    let strings = MethodType::method_type(JType::Int, vec![JType::string(), JType::Int]);
    let err = add().invoke(&strings, vec![Value::string("2"), Value::Int(3)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));
    let err = add().as_type(&ints(3)).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));

    // unboxing a null reference fails at call time
    let generic = MethodType::generic(2);
    let err = add().invoke(&generic, vec![Value::NULL, boxed(1)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::NullReference));
}

#[test]
fn invoke_with_arguments_boxes_everything() {
    let result = add().invoke_with_arguments(vec![Value::Int(20), Value::Int(22)]).unwrap();
    assert!(result.same_value(&boxed(42)));
    let err = add().invoke_with_arguments(vec![Value::Int(1)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));
}

fn greeter_classes() -> (ClassRef, ClassRef, ClassRef) {
    let code = MethodType::method_type(JType::Int, vec![]);
    let greeter = ClassBuilder::interface("demo/bind/Greeter")
        .method("code", code.clone(), ACC_PUBLIC, |_| Ok(Value::Int(1)))
        .build();
    let plain = ClassBuilder::new("demo/bind/Plain").implements(&greeter).build();
    let loud = ClassBuilder::new("demo/bind/Loud")
        .implements(&greeter)
        .method("code", code, ACC_PUBLIC, |_| Ok(Value::Int(2)))
        .build();
    (greeter, plain, loud)
}

#[test]
fn bind_to_keeps_dispatch_for_instance_methods() {
    let (greeter, plain, loud) = greeter_classes();
    let code = MethodType::method_type(JType::Int, vec![]);
    let handle = Lookup::new(&greeter).find_virtual(&greeter, "code", &code).unwrap();
    assert_eq!(handle.kind(), HandleKind::Interface);

    let on_plain = handle.bind_to(Value::object(ObjRef::new_instance(&plain))).unwrap();
    assert_eq!(on_plain.kind(), HandleKind::Bound);
    assert_eq!(on_plain.method_type(), &code);
    // default method
    assert_eq!(call(&on_plain, vec![]), Value::Int(1));

    let on_loud = handle.bind_to(Value::object(ObjRef::new_instance(&loud))).unwrap();
    assert_eq!(call(&on_loud, vec![]), Value::Int(2));

    let err = handle.bind_to(Value::object(ObjRef::new_instance(ops()))).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::ClassCast));

    let unbound = handle.bind_to(Value::NULL).unwrap();
    let err = unbound.invoke_exact(&code, vec![]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::NullReference));
}

#[test]
fn bind_to_inserts_for_other_handles() {
    let bound = concat().bind_to(Value::string("ab")).unwrap();
    assert_eq!(bound.kind(), HandleKind::Insert);
    assert_eq!(as_string(&call(&bound, vec![Value::string("cd")])), "abcd");

    let err = add().bind_to(Value::Int(1)).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn varargs_collector_adapts_to_any_trailing_count() {
    let string = JType::string();
    let join = join();
    assert!(!join.is_varargs_collector());
    let varargs = join.as_varargs_collector(&string_array()).unwrap();
    assert!(varargs.is_varargs_collector());
    assert_eq!(varargs.method_type(), join.method_type());
    assert!(varargs.as_fixed_arity().ptr_eq(&join));
    assert!(varargs.as_varargs_collector(&string_array()).unwrap().ptr_eq(&varargs));

    let three = MethodType::method_type(string.clone(), vec![string.clone(); 3]);
    let result = varargs
        .invoke(&three, vec![Value::string("-"), Value::string("a"), Value::string("b")])
        .unwrap();
    assert_eq!(as_string(&result), "a-b");

    let just_separator = MethodType::method_type(string.clone(), vec![string.clone()]);
    let result = varargs.invoke(&just_separator, vec![Value::string("-")]).unwrap();
    assert_eq!(as_string(&result), "");

    // an array in the trailing position is passed through
    let parts = Value::object(ObjRef::array_from(&string, vec![Value::string("x"), Value::string("y")]));
    let result = varargs
        .invoke(join.method_type(), vec![Value::string("+"), parts.clone()])
        .unwrap();
    assert_eq!(as_string(&result), "x+y");
    let result = varargs.invoke_exact(join.method_type(), vec![Value::string("/"), parts]).unwrap();
    assert_eq!(as_string(&result), "x/y");
}

#[test]
fn varargs_collector_needs_a_compatible_array() {
    let err = join().as_varargs_collector(&int_array()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = add().as_varargs_collector(&int_array()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = join().as_varargs_collector(&well_known().string).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn invokers_take_the_handle_first() {
    let exact = exact_invoker(&ints(2)).unwrap();
    assert_eq!(exact.kind(), HandleKind::InvokeExact);
    assert_eq!(
        exact.method_type(),
        &MethodType::method_type(
            JType::Int,
            vec![JType::of(&well_known().method_handle), JType::Int, JType::Int]
        )
    );
    assert_eq!(call(&exact, vec![add().to_value(), Value::Int(2), Value::Int(3)]), Value::Int(5));
    let err = exact
        .invoke_exact(
            exact.method_type(),
            vec![op("neg", &ints(1)).to_value(), Value::Int(2), Value::Int(3)],
        )
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));

    let generic = invoker(&MethodType::generic(2)).unwrap();
    assert_eq!(generic.kind(), HandleKind::InvokeGeneric);
    let result = call(&generic, vec![add().to_value(), boxed(4), boxed(5)]);
    assert!(result.same_value(&boxed(9)));

    let spread = spread_invoker(&ints(2), 0).unwrap();
    let array = Value::object(ObjRef::array_from(&JType::object(), vec![boxed(6), boxed(7)]));
    assert_eq!(call(&spread, vec![add().to_value(), array]), Value::Int(13));
    assert!(spread_invoker(&ints(2), 3).is_err());
}

#[test]
fn argument_slots_are_limited() {
    let nop = support::nop().unwrap();
    assert!(drop_arguments(&nop, 0, &vec![JType::Int; 254]).is_ok());
    let err = drop_arguments(&nop, 0, &vec![JType::Int; 255]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // long and double take two slots
    assert!(drop_arguments(&nop, 0, &vec![JType::Long; 127]).is_ok());
    let err = drop_arguments(&nop, 0, &vec![JType::Double; 128]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn dump_describes_the_graph() {
    let fixed = insert_arguments(&add(), 0, vec![Value::Int(1)]).unwrap();
    let dump = fixed.dump();
    assert_eq!(dump.kind, HandleKind::Insert);
    assert_eq!(dump.children.len(), 1);
    assert_eq!(dump.children[0].kind, HandleKind::Static);
    assert!(dump.children[0].member.is_some());

    let json = fixed.dump_json().unwrap();
    assert!(json.contains("\"kindCode\""));
    assert!(json.contains("\"children\""));
    assert!(json.contains("\"type\": \"(int)int\""));
}
