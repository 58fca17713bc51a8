use crate::class::well_known;
use crate::error::{ErrorKind, kind_of, throwable_of};
use crate::handle::HandleKind;
use crate::handle::combinators::{insert_arguments, spread_arguments};
use crate::handle::control::catch_exception;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::*;

#[test]
fn direct_static_add_and_exact_type_mismatch() {
    let add = add();
    assert_eq!(add.kind(), HandleKind::Static);
    assert_eq!(add.invoke_exact(&ints(2), vec![Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));

    let longs = MethodType::method_type(JType::Int, vec![JType::Long, JType::Long]);
    let err = add.invoke_exact(&longs, vec![Value::Long(2), Value::Long(3)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));

    // right call type, wrongly typed argument
    let err = add.invoke_exact(&ints(2), vec![Value::Long(2), Value::Int(3)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));
}

#[test]
fn insert_fixes_leading_argument() {
    let digits = digits();
    let two = MethodType::method_type(JType::Int, vec![JType::Int, JType::Int]);
    let fixed = insert_arguments(&digits, 0, vec![Value::Int(1)]).unwrap();
    assert_eq!(fixed.kind(), HandleKind::Insert);
    assert_eq!(fixed.method_type(), &two);
    assert_eq!(
        call(&fixed, vec![Value::Int(2), Value::Int(3)]),
        call(&digits, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let add10 = insert_arguments(&add(), 0, vec![Value::Int(10)]).unwrap();
    assert_eq!(add10.method_type(), &ints(1));
    assert_eq!(call(&add10, vec![Value::Int(5)]), call(&add(), vec![Value::Int(10), Value::Int(5)]));
    assert_eq!(call(&add10, vec![Value::Int(5)]), Value::Int(15));
}

#[test]
fn spread_trailing_int_array() {
    let digits = digits();
    let spread = spread_arguments(&digits, 1, &int_array(), 2).unwrap();
    assert_eq!(spread.kind(), HandleKind::Spread);
    assert_eq!(
        spread.method_type(),
        &MethodType::method_type(JType::Int, vec![JType::Int, JType::of(&int_array())])
    );
    assert_eq!(
        call(&spread, vec![Value::Int(1), int_array_value(&[2, 3])]),
        call(&digits, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let err = spread
        .invoke_exact(spread.method_type(), vec![Value::Int(1), int_array_value(&[2])])
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = spread
        .invoke_exact(spread.method_type(), vec![Value::Int(1), Value::NULL])
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn catch_arithmetic_and_propagate_others() {
    let div = op("div", &ints(2));
    let arithmetic = well_known().arithmetic.clone();
    let recover = op(
        "recover",
        &MethodType::method_type(JType::Int, vec![JType::of(&arithmetic), JType::Int]),
    );
    let guarded = catch_exception(&div, &arithmetic, &recover).unwrap();
    assert_eq!(guarded.kind(), HandleKind::Catch);
    assert_eq!(guarded.method_type(), &ints(2));

    assert_eq!(call(&guarded, vec![Value::Int(9), Value::Int(3)]), Value::Int(3));
    // handler sees the throwable and the first argument
    assert_eq!(call(&guarded, vec![Value::Int(7), Value::Int(0)]), Value::Int(1007));

    let err = guarded
        .invoke_exact(&ints(2), vec![Value::Int(-1), Value::Int(0)])
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalState));
    assert_eq!(throwable_of(&err).and_then(|t| t.message()), Some("negative dividend"));
}
