use crate::class::well_known;
use crate::error::{ErrorKind, kind_of};
use crate::handle::HandleKind;
use crate::handle::constant::*;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

use super::*;

#[test]
fn constants_pick_their_kind() {
    let int = constant(&JType::Int, Value::Int(7)).unwrap();
    assert_eq!(int.kind(), HandleKind::ConstantInt);
    assert_eq!(call(&int, vec![]), Value::Int(7));

    let long = constant(&JType::Long, Value::Int(7)).unwrap();
    assert_eq!(long.kind(), HandleKind::ConstantLong);
    assert_eq!(call(&long, vec![]), Value::Long(7));

    let double = constant(&JType::Double, Value::Double(0.5)).unwrap();
    assert_eq!(double.kind(), HandleKind::ConstantDouble);
    let float = constant(&JType::Float, Value::Float(1.5)).unwrap();
    assert_eq!(float.kind(), HandleKind::ConstantFloat);

    let text = constant(&JType::string(), Value::string("hi")).unwrap();
    assert_eq!(text.kind(), HandleKind::ConstantObject);
    assert_eq!(as_string(&call(&text, vec![])), "hi");

    let boolean = constant(&JType::Boolean, Value::Boolean(true)).unwrap();
    assert_eq!(boolean.kind(), HandleKind::ConstantInt);
}

#[test]
fn constant_rejects_bad_values() {
    let err = constant(&JType::Void, Value::Void).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = constant(&JType::Int, Value::NULL).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = constant(&JType::string(), Value::Int(1)).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::ClassCast));
    let err = constant(&JType::Int, Value::Long(1)).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::ClassCast));
}

#[test]
fn identity_zero_and_empty() {
    let id = identity(&JType::string()).unwrap();
    assert_eq!(id.method_type(), &MethodType::method_type(JType::string(), vec![JType::string()]));
    assert_eq!(as_string(&call(&id, vec![Value::string("same")])), "same");

    assert_eq!(call(&zero(&JType::Int).unwrap(), vec![]), Value::Int(0));
    assert_eq!(call(&zero(&JType::string()).unwrap(), vec![]), Value::NULL);
    let nothing = zero(&JType::Void).unwrap();
    assert_eq!(nothing.method_type(), &MethodType::method_type(JType::Void, vec![]));

    let ty = MethodType::method_type(JType::Long, vec![JType::Int, JType::string()]);
    let e = empty(&ty).unwrap();
    assert_eq!(e.method_type(), &ty);
    assert_eq!(call(&e, vec![Value::Int(3), Value::string("x")]), Value::Long(0));
}

#[test]
fn throw_exception_raises_its_argument() {
    let arithmetic = well_known().arithmetic.clone();
    let thrower = throw_exception(&JType::Int, &arithmetic).unwrap();
    assert_eq!(
        thrower.method_type(),
        &MethodType::method_type(JType::Int, vec![JType::of(&arithmetic)])
    );
    let exception = Value::object(ObjRef::throwable(&arithmetic, Some("boom")));
    let err = call_err(&thrower, vec![exception]);
    assert_eq!(kind_of(&err), Some(ErrorKind::Guest));
    assert!(crate::error::throwable_of(&err).is_some_and(|t| t.is_instance_of(&arithmetic)));

    let err = throw_exception(&JType::Int, &well_known().string).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

fn call_err(handle: &MethodHandle, args: Vec<Value>) -> anyhow::Error {
    handle.invoke_exact(handle.method_type(), args).unwrap_err()
}

#[test]
fn array_accessors() {
    let ints = int_array();
    let make = array_constructor(&ints).unwrap();
    assert_eq!(make.method_type(), &MethodType::method_type(JType::of(&ints), vec![JType::Int]));
    let array = call(&make, vec![Value::Int(3)]);

    let set = array_element_setter(&ints).unwrap();
    call(&set, vec![array.clone(), Value::Int(1), Value::Int(42)]);
    let get = array_element_getter(&ints).unwrap();
    assert_eq!(call(&get, vec![array.clone(), Value::Int(1)]), Value::Int(42));
    assert_eq!(call(&get, vec![array.clone(), Value::Int(0)]), Value::Int(0));
    let length = array_length(&ints).unwrap();
    assert_eq!(call(&length, vec![array.clone()]), Value::Int(3));

    let err = call_err(&get, vec![array, Value::Int(3)]);
    assert_eq!(kind_of(&err), Some(ErrorKind::ArrayIndex));
    let err = call_err(&length, vec![Value::NULL]);
    assert_eq!(kind_of(&err), Some(ErrorKind::NullReference));
    let err = array_length(&well_known().string).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}
