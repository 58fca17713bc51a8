use crate::error::{ErrorKind, kind_of};
use crate::handle::HandleKind;
use crate::handle::combinators::*;
use crate::handle::constant::{constant, identity};
use crate::handle::support;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::*;

#[test]
fn permute_of_permute_collapses() {
    let digits = digits();
    let p1 = permute_arguments(&digits, &ints(3), &[2, 0, 1]).unwrap();
    let p2 = permute_arguments(&p1, &ints(3), &[0, 2, 1]).unwrap();
    assert_eq!(p2.kind(), HandleKind::Permute);
    assert!(p2.next().unwrap().ptr_eq(&digits));

    let single = permute_arguments(&digits, &ints(3), &[1, 0, 2]).unwrap();
    let args = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
    assert_eq!(call(&p2, args.clone()), Value::Int(213));
    assert_eq!(call(&p2, args.clone()), call(&single, args));
}

#[test]
fn permute_validates_and_skips_identity() {
    let digits = digits();
    assert!(permute_arguments(&digits, &ints(3), &[0, 1, 2]).unwrap().ptr_eq(&digits));

    let err = permute_arguments(&digits, &ints(3), &[0, 1]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = permute_arguments(&digits, &ints(3), &[0, 1, 3]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let longs = MethodType::method_type(JType::Int, vec![JType::Long, JType::Int, JType::Int]);
    let err = permute_arguments(&digits, &longs, &[0, 1, 2]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));

    // duplication
    let dup = permute_arguments(&digits, &ints(2), &[0, 1, 0]).unwrap();
    assert_eq!(call(&dup, vec![Value::Int(4), Value::Int(5)]), Value::Int(454));
}

#[test]
fn drop_arguments_ignores_inserted_slots() {
    let dropped = drop_arguments(&add(), 1, &[JType::string(), JType::Long]).unwrap();
    assert_eq!(
        dropped.method_type(),
        &MethodType::method_type(JType::Int, vec![JType::Int, JType::string(), JType::Long, JType::Int])
    );
    let result = call(
        &dropped,
        vec![Value::Int(1), Value::string("ignored"), Value::Long(9), Value::Int(2)],
    );
    assert_eq!(result, Value::Int(3));
    assert!(drop_arguments(&add(), 3, &[JType::Int]).is_err());
}

#[test]
fn drop_arguments_to_match_aligns_the_tail() {
    // digits(a, b, c) with (b, c) found at position 1 of (String, int, int, long)
    let tail = [JType::string(), JType::Int, JType::Int, JType::Long];
    let matched = drop_arguments_to_match(&digits(), 1, &tail, 1).unwrap();
    assert_eq!(
        matched.method_type(),
        &MethodType::method_type(
            JType::Int,
            vec![JType::Int, JType::string(), JType::Int, JType::Int, JType::Long]
        )
    );
    let result = call(
        &matched,
        vec![Value::Int(1), Value::string("x"), Value::Int(2), Value::Int(3), Value::Long(4)],
    );
    assert_eq!(result, Value::Int(123));

    // skipping everything appends the new types untouched
    let appended = drop_arguments_to_match(&add(), 2, &[JType::Long], 0).unwrap();
    assert_eq!(call(&appended, vec![Value::Int(4), Value::Int(5), Value::Long(0)]), Value::Int(9));

    for (skip, types, position) in [
        (3, vec![JType::Int], 0),
        (0, vec![JType::Int, JType::Int], 1),
        (0, vec![JType::Long, JType::Int], 0),
        (1, vec![JType::Int, JType::Void], 0),
    ] {
        let err = drop_arguments_to_match(&add(), skip, &types, position).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument), "{skip} {types:?} {position}");
    }
}

#[test]
fn collect_then_spread_round_trips() {
    let digits = digits();
    let spread = digits.as_spreader(0, &int_array(), 3).unwrap();
    let collected = spread.as_collector(0, &int_array(), 3).unwrap();
    assert_eq!(collected.method_type(), &ints(3));
    let args = vec![Value::Int(4), Value::Int(5), Value::Int(6)];
    assert_eq!(call(&collected, args.clone()), call(&digits, args));

    // zero elements: the slot disappears and an empty array is passed
    let neg = op("neg", &ints(1));
    let spread0 = neg.as_spreader(1, &int_array(), 0).unwrap();
    assert_eq!(
        spread0.method_type(),
        &MethodType::method_type(JType::Int, vec![JType::Int, JType::of(&int_array())])
    );
    let collected0 = spread0.as_collector(1, &int_array(), 0).unwrap();
    assert_eq!(collected0.method_type(), &ints(1));
    assert_eq!(call(&collected0, vec![Value::Int(5)]), Value::Int(-5));
    assert_eq!(call(&spread0, vec![Value::Int(5), Value::NULL]), Value::Int(-5));
}

#[test]
fn collect_into_fresh_arrays() {
    let sum = op(
        "sum",
        &MethodType::method_type(JType::Int, vec![JType::Int, JType::of(&int_array())]),
    );
    let collected = collect_into_array(&sum, 1, &int_array(), 2).unwrap();
    assert_eq!(collected.kind(), HandleKind::Collect);
    assert_eq!(collected.method_type(), &ints(3));
    assert_eq!(call(&collected, vec![Value::Int(1), Value::Int(2), Value::Int(3)]), Value::Int(6));

    let err = collect_into_array(&add(), 0, &int_array(), 2).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn spread_adapts_boxed_array_elements() {
    let objects = ClassRef::array_of(&JType::object());
    let spread = add().as_spreader(0, &objects, 2).unwrap();
    let array = Value::object(ObjRef::array_from(
        &JType::object(),
        vec![Value::Int(3).boxed(), Value::Int(4).boxed()],
    ));
    assert_eq!(call(&spread, vec![array]), Value::Int(7));

    let wrong = int_array_value(&[1, 2]);
    let err = spread.invoke_exact(spread.method_type(), vec![wrong]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));
}

#[test]
fn filter_arguments_trims_absent_filters() {
    let neg = op("neg", &ints(1));
    let digits = digits();
    let filtered = filter_arguments(&digits, 0, vec![None, Some(neg.clone()), None]).unwrap();
    assert_eq!(filtered.kind(), HandleKind::FilterArguments);
    assert_eq!(
        filtered.dump().params,
        vec![1, 1],
        "leading absent filter is folded into the start offset"
    );
    assert_eq!(call(&filtered, vec![Value::Int(1), Value::Int(2), Value::Int(3)]), Value::Int(100 - 20 + 3));

    assert!(filter_arguments(&digits, 0, vec![None, None]).unwrap().ptr_eq(&digits));

    let err = filter_arguments(&digits, 0, vec![Some(add())]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    let err = filter_arguments(&digits, 2, vec![Some(neg.clone()), Some(neg)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn filter_return_value_pipes_the_result() {
    let neg = op("neg", &ints(1));
    let filtered = filter_return_value(&add(), &neg).unwrap();
    assert_eq!(filtered.method_type(), &ints(2));
    assert_eq!(call(&filtered, vec![Value::Int(2), Value::Int(3)]), Value::Int(-5));

    // void target: the filter takes nothing
    let seven = constant(&JType::Int, Value::Int(7)).unwrap();
    let after_nop = filter_return_value(&support::nop().unwrap(), &seven).unwrap();
    assert_eq!(after_nop.method_type(), &ints(0));
    assert_eq!(call(&after_nop, vec![]), Value::Int(7));

    let err = filter_return_value(&add(), &add()).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn fold_inserts_the_combiner_result() {
    // digits(add(a, b), a, b)
    let folded = fold_arguments(&digits(), 0, &add()).unwrap();
    assert_eq!(folded.kind(), HandleKind::Fold);
    assert_eq!(folded.method_type(), &ints(2));
    assert_eq!(call(&folded, vec![Value::Int(2), Value::Int(3)]), Value::Int(523));

    // digits(a, neg(c), b, c) reading argument 2 only
    let neg = op("neg", &ints(1));
    let wide = drop_arguments(&digits(), 3, &[JType::Int]).unwrap();
    let picked = fold_arguments_with_indices(&wide, 1, &neg, &[2]).unwrap();
    assert_eq!(picked.method_type(), &ints(3));
    assert_eq!(call(&picked, vec![Value::Int(1), Value::Int(0), Value::Int(3)]), Value::Int(100 - 30));

    let err = fold_arguments_with_indices(&wide, 1, &neg, &[0, 1]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
}

#[test]
fn collect_arguments_with_void_and_value_filters() {
    // non-void: digits(add(a, b), c)
    let two = MethodType::method_type(JType::Int, vec![JType::Int, JType::Int]);
    let pair = permute_arguments(&digits(), &two, &[0, 1, 1]).unwrap();
    let merged = collect_arguments(&pair, 0, &add()).unwrap();
    assert_eq!(merged.method_type(), &ints(3));
    // digits(1 + 2, 4, 4)
    assert_eq!(call(&merged, vec![Value::Int(1), Value::Int(2), Value::Int(4)]), Value::Int(344));

    // void filter only consumes its arguments
    let sink = drop_arguments(&support::nop().unwrap(), 0, &[JType::Int]).unwrap();
    let consumed = collect_arguments(&add(), 1, &sink).unwrap();
    assert_eq!(consumed.method_type(), &ints(3));
    assert_eq!(call(&consumed, vec![Value::Int(1), Value::Int(99), Value::Int(2)]), Value::Int(3));
}

#[test]
fn insert_coerces_constants() {
    let widened = insert_arguments(
        &identity(&JType::Long).unwrap(),
        0,
        vec![Value::Int(5)],
    )
    .unwrap();
    assert_eq!(call(&widened, vec![]), Value::Long(5));

    let boxed = insert_arguments(&add(), 1, vec![Value::Int(2).boxed()]).unwrap();
    assert_eq!(call(&boxed, vec![Value::Int(40)]), Value::Int(42));

    let err = insert_arguments(&add(), 0, vec![Value::NULL]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::NullReference));
    let err = insert_arguments(&add(), 0, vec![Value::Long(1)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::ClassCast));
    let err = insert_arguments(&add(), 3, vec![Value::Int(1)]).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::IllegalArgument));
    assert!(insert_arguments(&add(), 0, vec![]).unwrap().ptr_eq(&add()));
}

#[test]
fn explicit_cast_allows_narrowing() {
    let longs = MethodType::method_type(JType::Long, vec![JType::Long, JType::Long]);
    let err = add().as_type(&longs).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::WrongMethodType));

    let cast = explicit_cast_arguments(&add(), &longs).unwrap();
    assert_eq!(cast.kind(), HandleKind::ExplicitCast);
    assert_eq!(call(&cast, vec![Value::Long(2), Value::Long(3)]), Value::Long(5));
}
