use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::class::flags::*;
use crate::class::{ClassBuilder, well_known};
use crate::error::{ErrorKind, kind_of, throwable_of};
use crate::handle::HandleKind;
use crate::handle::combinators::drop_arguments;
use crate::handle::constant::constant;
use crate::handle::control::*;
use crate::lookup::Lookup;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::*;

fn is_positive() -> MethodHandle {
    op("isPositive", &MethodType::method_type(JType::Boolean, vec![JType::Int]))
}

#[test]
fn guard_picks_a_branch_from_an_argument_prefix() {
    let neg = drop_arguments(&op("neg", &ints(1)), 1, &[JType::Int]).unwrap();
    let guarded = guard_with_test(&is_positive(), &add(), &neg).unwrap();
    assert_eq!(guarded.kind(), HandleKind::GuardWithTest);
    assert_eq!(call(&guarded, vec![Value::Int(2), Value::Int(3)]), Value::Int(5));
    assert_eq!(call(&guarded, vec![Value::Int(-2), Value::Int(3)]), Value::Int(2));

    let err = guard_with_test(&is_positive(), &add(), &op("neg", &ints(1))).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = guard_with_test(&add(), &add(), &add()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn catch_validates_its_handler() {
    let div = op("div", &ints(2));
    let arithmetic = well_known().arithmetic.clone();
    // handler must start with the caught class
    let err = catch_exception(&div, &arithmetic, &add()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = catch_exception(&div, &well_known().string, &add()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // a handler taking only the throwable
    let fallback = drop_arguments(
        &constant(&JType::Int, Value::Int(-1)).unwrap(),
        0,
        &[JType::of(&arithmetic)],
    )
    .unwrap();
    let guarded = catch_exception(&div, &arithmetic, &fallback).unwrap();
    assert_eq!(call(&guarded, vec![Value::Int(1), Value::Int(0)]), Value::Int(-1));
}

#[test]
fn catch_of_a_superclass_sees_subclasses() {
    let div = op("div", &ints(2));
    let runtime = well_known().runtime_exception.clone();
    let fallback = drop_arguments(
        &constant(&JType::Int, Value::Int(0)).unwrap(),
        0,
        &[JType::of(&runtime)],
    )
    .unwrap();
    let guarded = catch_exception(&div, &runtime, &fallback).unwrap();
    // both the arithmetic and the illegal-state failures are runtime exceptions
    assert_eq!(call(&guarded, vec![Value::Int(1), Value::Int(0)]), Value::Int(0));
    assert_eq!(call(&guarded, vec![Value::Int(-1), Value::Int(1)]), Value::Int(0));
}

struct Cleanup {
    class: ClassRef,
    runs: Arc<AtomicUsize>,
}

fn cleanup_class(name: &str) -> Cleanup {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let throwable = JType::of(&well_known().throwable);
    let class = ClassBuilder::new(name)
        .method(
            "after",
            MethodType::method_type(JType::Int, vec![throwable, JType::Int, JType::Int]),
            ACC_PUBLIC | ACC_STATIC,
            move |args| {
                counter.fetch_add(1, Ordering::SeqCst);
                if args[0].is_null() {
                    Ok(Value::Int(args[1].as_int()? + args[2].as_int()?))
                } else {
                    Ok(Value::Int(-1))
                }
            },
        )
        .build();
    Cleanup { class, runs }
}

#[test]
fn finally_runs_on_both_paths() {
    let Cleanup { class, runs } = cleanup_class("demo/FinallyBoth");
    let throwable = JType::of(&well_known().throwable);
    let after = Lookup::new(&class)
        .find_static(
            &class,
            "after",
            &MethodType::method_type(JType::Int, vec![throwable, JType::Int, JType::Int]),
        )
        .unwrap();
    let div = op("div", &ints(2));
    let wrapped = try_finally(&div, &after).unwrap();
    assert_eq!(wrapped.kind(), HandleKind::Finally);

    // result 3 plus the first argument
    assert_eq!(call(&wrapped, vec![Value::Int(9), Value::Int(3)]), Value::Int(12));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let err = wrapped
        .invoke_exact(&ints(2), vec![Value::Int(9), Value::Int(0)])
        .unwrap_err();
    assert!(throwable_of(&err).is_some_and(|t| t.is_instance_of(&well_known().arithmetic)));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn finally_checks_the_cleanup_shape() {
    let Cleanup { class, .. } = cleanup_class("demo/FinallyShape");
    let throwable = JType::of(&well_known().throwable);
    let after = Lookup::new(&class)
        .find_static(
            &class,
            "after",
            &MethodType::method_type(JType::Int, vec![throwable, JType::Int, JType::Int]),
        )
        .unwrap();
    let err = try_finally(&op("neg", &ints(1)), &add()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    // trailing (int) is not a prefix of (short)
    let short_target = op("neg", &ints(1))
        .as_type(&MethodType::method_type(JType::Int, vec![JType::Short]))
        .unwrap();
    let err = try_finally(&short_target, &after).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}
