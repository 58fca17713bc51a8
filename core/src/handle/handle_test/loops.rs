use crate::error::{ErrorKind, kind_of};
use crate::handle::HandleKind;
use crate::handle::combinators::{drop_arguments, insert_arguments, permute_arguments};
use crate::handle::constant::{constant, identity};
use crate::handle::control::*;
use crate::handle::support;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::*;

fn int_constant(value: i32) -> MethodHandle {
    constant(&JType::Int, Value::Int(value)).unwrap()
}

fn decrement() -> MethodHandle {
    insert_arguments(&add(), 1, vec![Value::Int(-1)]).unwrap()
}

fn is_positive() -> MethodHandle {
    op("isPositive", &MethodType::method_type(JType::Boolean, vec![JType::Int]))
}

#[test]
fn counted_loop_sums_the_counter() {
    // v += i for i in 0..n
    let body = drop_arguments(&add(), 2, &[JType::Int]).unwrap();
    let looped = counted_loop(&identity(&JType::Int).unwrap(), Some(&int_constant(0)), &body).unwrap();
    assert_eq!(looped.kind(), HandleKind::Loop);
    assert_eq!(looped.method_type(), &ints(1));
    assert_eq!(call(&looped, vec![Value::Int(5)]), Value::Int(10));
    assert_eq!(call(&looped, vec![Value::Int(0)]), Value::Int(0));
    assert_eq!(call(&looped, vec![Value::Int(-3)]), Value::Int(0));
}

#[test]
fn counted_loop_range_starts_at_the_lower_bound() {
    let body = drop_arguments(&add(), 2, &[JType::Int]).unwrap();
    let start = drop_arguments(&int_constant(2), 0, &[JType::Int]).unwrap();
    let end = identity(&JType::Int).unwrap();
    let looped = counted_loop_range(&start, &end, Some(&int_constant(0)), &body).unwrap();
    assert_eq!(call(&looped, vec![Value::Int(5)]), Value::Int(2 + 3 + 4));

    let err = counted_loop_range(&int_constant(0), &end, None, &body).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let longs = identity(&JType::Long).unwrap();
    let err = counted_loop(&longs, None, &body).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn counted_loop_with_a_void_body() {
    let body = drop_arguments(&support::nop().unwrap(), 0, &[JType::Int, JType::Int]).unwrap();
    let looped = counted_loop(&identity(&JType::Int).unwrap(), None, &body).unwrap();
    assert_eq!(looped.method_type(), &MethodType::method_type(JType::Void, vec![JType::Int]));
    assert_eq!(call(&looped, vec![Value::Int(3)]), Value::Void);
}

#[test]
fn while_checks_before_the_body_and_do_while_after() {
    let init = identity(&JType::Int).unwrap();
    let while_ = while_loop(Some(&init), &is_positive(), &decrement()).unwrap();
    assert_eq!(while_.method_type(), &ints(1));
    assert_eq!(call(&while_, vec![Value::Int(3)]), Value::Int(0));
    assert_eq!(call(&while_, vec![Value::Int(0)]), Value::Int(0));
    assert_eq!(call(&while_, vec![Value::Int(-4)]), Value::Int(-4));

    let do_while = do_while_loop(Some(&init), &decrement(), &is_positive()).unwrap();
    assert_eq!(call(&do_while, vec![Value::Int(3)]), Value::Int(0));
    assert_eq!(call(&do_while, vec![Value::Int(0)]), Value::Int(-1));
    assert_eq!(call(&do_while, vec![Value::Int(-4)]), Value::Int(-5));
}

#[test]
fn generic_loop_with_two_variables() {
    // acc = 1, i = 0; while (i < n) { acc = acc + acc; i++ } return acc
    let three = MethodType::method_type(JType::Int, vec![JType::Int, JType::Int, JType::Int]);
    let double = permute_arguments(&add(), &three, &[0, 0]).unwrap();
    let bump = drop_arguments(&insert_arguments(&add(), 1, vec![Value::Int(1)]).unwrap(), 0, &[JType::Int]).unwrap();
    let below = permute_arguments(
        &support::counter_predicate().unwrap(),
        &MethodType::method_type(JType::Boolean, vec![JType::Int, JType::Int, JType::Int]),
        &[2, 1],
    )
    .unwrap();
    let fini = identity(&JType::Int).unwrap();
    let looped = loop_(vec![
        LoopClause::new(Some(&int_constant(1)), Some(&double), None, None),
        LoopClause::new(Some(&int_constant(0)), Some(&bump), Some(&below), Some(&fini)),
    ])
    .unwrap();
    assert_eq!(looped.method_type(), &ints(1));
    assert_eq!(call(&looped, vec![Value::Int(4)]), Value::Int(16));
    assert_eq!(call(&looped, vec![Value::Int(0)]), Value::Int(2));

    // empty clauses are skipped
    let padded = loop_(vec![
        LoopClause::default(),
        LoopClause::new(Some(&int_constant(1)), Some(&double), None, None),
        LoopClause::new(Some(&int_constant(0)), Some(&bump), Some(&below), Some(&fini)),
    ])
    .unwrap();
    assert_eq!(call(&padded, vec![Value::Int(3)]), Value::Int(8));
}

#[test]
fn loop_rejects_malformed_clauses() {
    let err = loop_(vec![]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = loop_(vec![LoopClause::default()]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // no predicate anywhere
    let err = loop_(vec![LoopClause::new(Some(&int_constant(0)), Some(&decrement()), None, None)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // init and step disagree on the variable type
    let long_init = constant(&JType::Long, Value::Long(0)).unwrap();
    let err = loop_(vec![LoopClause::new(Some(&long_init), Some(&decrement()), Some(&is_positive()), None)])
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // predicate must return boolean
    let err = loop_(vec![LoopClause::new(Some(&int_constant(0)), Some(&decrement()), Some(&decrement()), None)])
        .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // finalizers must agree
    let long_fini = drop_arguments(&constant(&JType::Long, Value::Long(0)).unwrap(), 0, &[JType::Int]).unwrap();
    let err = loop_(vec![
        LoopClause::new(Some(&int_constant(0)), Some(&decrement()), Some(&is_positive()), Some(&identity(&JType::Int).unwrap())),
        LoopClause::new(None, None, Some(&is_positive()), Some(&long_fini)),
    ])
    .unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

fn strings(items: &[&str]) -> Value {
    Value::object(ObjRef::array_from(&JType::string(), items.iter().map(|s| Value::string(s)).collect()))
}

fn cursor_over(items: Value) -> Value {
    let cursor = ObjRef::new_instance(&CURSOR);
    cursor.set_field(0, items);
    Value::object(cursor)
}

/// `java/util/Iterator` over a string array: `items` at offset 0, `pos` at 1.
static CURSOR: Lazy<ClassRef> = Lazy::new(|| {
    let iterator = JType::of(&well_known().iterator);
    ClassBuilder::new("demo/Cursor")
        .implements(&well_known().iterator)
        .field("items", JType::of(&string_array()), ACC_PUBLIC)
        .field("pos", JType::Int, ACC_PUBLIC)
        .method("hasNext", MethodType::method_type(JType::Boolean, vec![]), ACC_PUBLIC, |args| {
            let this = args[0].as_object().ok_or_else(|| error::null_reference("this"))?;
            let len = this.field(0).and_then(|v| v.as_object().and_then(|o| o.array_length())).unwrap_or(0);
            let pos = this.field(1).unwrap_or(Value::Int(0)).as_int()?;
            Ok(Value::Boolean((pos as usize) < len))
        })
        .method("next", MethodType::method_type(JType::object(), vec![]), ACC_PUBLIC, |args| {
            let this = args[0].as_object().ok_or_else(|| error::null_reference("this"))?;
            let items = this.field(0).and_then(|v| v.as_object().cloned());
            let items = items.ok_or_else(|| error::illegal_state("no items"))?;
            let pos = this.field(1).unwrap_or(Value::Int(0)).as_int()?;
            this.set_field(1, Value::Int(pos + 1));
            items.array_get(pos)
        })
        .method(
            "over",
            MethodType::method_type(iterator, vec![JType::of(&string_array())]),
            ACC_PUBLIC | ACC_STATIC,
            |args| Ok(cursor_over(args[0].clone())),
        )
        .build()
});

static BAG: Lazy<ClassRef> = Lazy::new(|| {
    ClassBuilder::new("demo/Bag")
        .implements(&well_known().iterable)
        .field("items", JType::of(&string_array()), ACC_PUBLIC)
        .method(
            "iterator",
            MethodType::method_type(JType::of(&well_known().iterator), vec![]),
            ACC_PUBLIC,
            |args| {
                let this = args[0].as_object().ok_or_else(|| error::null_reference("this"))?;
                Ok(cursor_over(this.field(0).unwrap_or(Value::NULL)))
            },
        )
        .build()
});

fn bag(items: &[&str]) -> Value {
    let bag = ObjRef::new_instance(&BAG);
    bag.set_field(0, strings(items));
    Value::object(bag)
}

fn concat() -> MethodHandle {
    let string = JType::string();
    op("concat", &MethodType::method_type(string.clone(), vec![string.clone(), string]))
}

fn empty_string() -> MethodHandle {
    constant(&JType::string(), Value::string("")).unwrap()
}

#[test]
fn iterated_loop_walks_an_iterable() {
    let looped = iterated_loop(None, Some(&empty_string()), &concat()).unwrap();
    assert_eq!(looped.kind(), HandleKind::Loop);
    assert_eq!(
        looped.method_type(),
        &MethodType::method_type(JType::string(), vec![JType::of(&well_known().iterable)])
    );
    assert_eq!(as_string(&call(&looped, vec![bag(&["a", "b", "c"])])), "abc");
    assert_eq!(as_string(&call(&looped, vec![bag(&[])])), "");

    // the first loop parameter narrows the receiver of iterator()
    let bag_type = JType::of(&BAG);
    let body = drop_arguments(&concat(), 2, std::slice::from_ref(&bag_type)).unwrap();
    let looped = iterated_loop(None, Some(&empty_string()), &body).unwrap();
    assert_eq!(looped.method_type(), &MethodType::method_type(JType::string(), vec![bag_type]));
    assert_eq!(as_string(&call(&looped, vec![bag(&["x", "y"])])), "xy");
}

#[test]
fn iterated_loop_with_an_explicit_iterator() {
    let array = JType::of(&string_array());
    let over = Lookup::new(&CURSOR)
        .find_static(
            &CURSOR,
            "over",
            &MethodType::method_type(JType::of(&well_known().iterator), vec![array.clone()]),
        )
        .unwrap();
    let body = drop_arguments(&concat(), 2, std::slice::from_ref(&array)).unwrap();
    let looped = iterated_loop(Some(&over), Some(&empty_string()), &body).unwrap();
    assert_eq!(looped.method_type(), &MethodType::method_type(JType::string(), vec![array]));
    assert_eq!(as_string(&call(&looped, vec![strings(&["1", "2", "3"])])), "123");

    // without init the result starts out null
    let looped = iterated_loop(Some(&over), None, &body).unwrap();
    assert_eq!(as_string(&call(&looped, vec![strings(&["1"])])), "null1");
}

#[test]
fn iterated_loop_rejects_mismatched_handles() {
    let no_element = empty_string();
    let err = iterated_loop(None, None, &no_element).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // an int accumulator unboxes each element; the loop variable must come first
    assert!(iterated_loop(None, None, &add()).is_ok());
    let mismatched = drop_arguments(&is_positive(), 0, &[JType::Int]).unwrap();
    let err = iterated_loop(None, None, &mismatched).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // iterator handles must produce an Iterator
    let err = iterated_loop(Some(&int_constant(1)), None, &concat()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // without an iterator the first loop parameter must be Iterable
    let body = drop_arguments(&concat(), 2, &[JType::Int]).unwrap();
    let err = iterated_loop(None, None, &body).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}
