use std::sync::Arc;

use crate::config;
use crate::handle::HandleKind;
use crate::handle::combinators::{insert_arguments, permute_arguments};
use crate::thunk::{ArgSource, ThunkTable, key_for};

use super::*;

#[test]
fn equal_shapes_share_a_descriptor() {
    let ten = insert_arguments(&add(), 0, vec![Value::Int(10)]).unwrap();
    let twenty = insert_arguments(&add(), 0, vec![Value::Int(20)]).unwrap();
    assert!(!ten.ptr_eq(&twenty));
    assert!(Arc::ptr_eq(&ten.thunks(), &twenty.thunks()));

    // inserted at a different position
    let trailing = insert_arguments(&add(), 1, vec![Value::Int(10)]).unwrap();
    assert!(!Arc::ptr_eq(&ten.thunks(), &trailing.thunks()));

    // references erase to Object
    let string = JType::string();
    let concat = op("concat", &MethodType::method_type(string.clone(), vec![string.clone(), string.clone()]));
    let join = op(
        "join",
        &MethodType::method_type(string.clone(), vec![string, JType::of(&string_array())]),
    );
    assert!(Arc::ptr_eq(&concat.thunks(), &join.thunks()));
    assert!(!Arc::ptr_eq(&add().thunks(), &digits().thunks()));
}

#[test]
fn descriptor_carries_the_argument_plan() {
    let fixed = insert_arguments(&digits(), 1, vec![Value::Int(5)]).unwrap();
    let descriptor = fixed.thunks();
    assert_eq!(descriptor.key().kind, HandleKind::Insert);
    assert_eq!(descriptor.key().unshareable, None);
    let template = descriptor.template();
    assert_eq!(template.arity, 2);
    assert_eq!(template.calls.len(), 1);
    assert_eq!(
        template.calls[0].args,
        vec![
            ArgSource::Slice { start: 0, end: 1 },
            ArgSource::Data(0),
            ArgSource::Slice { start: 1, end: 2 },
        ]
    );

    let swapped = permute_arguments(&add(), &ints(2), &[1, 0]).unwrap();
    assert_eq!(&*swapped.thunks().key().params, &[1, 0]);
}

#[test]
fn hot_handles_get_a_custom_thunk() {
    let threshold = config::custom_thunk_threshold();
    let hot = insert_arguments(&add(), 0, vec![Value::Int(1)]).unwrap();
    for i in 0..threshold - 1 {
        call(&hot, vec![Value::Int(i as i32)]);
    }
    assert!(hot.custom_thunk().is_none());
    assert_eq!(hot.invocation_count(), threshold - 1);

    call(&hot, vec![Value::Int(0)]);
    let custom = hot.custom_thunk().unwrap();
    assert_eq!(custom.key().unshareable, Some(hot.identity()));
    assert!(!Arc::ptr_eq(&custom, &hot.thunks()));

    // further calls keep the same custom thunk
    call(&hot, vec![Value::Int(0)]);
    assert!(Arc::ptr_eq(&hot.custom_thunk().unwrap(), &custom));
}

#[test]
fn custom_thunks_stay_with_their_handle() {
    let threshold = config::custom_thunk_threshold();
    let mut keys = Vec::new();
    for n in 0..40 {
        let hot = insert_arguments(&add(), 0, vec![Value::Int(n)]).unwrap();
        for _ in 0..threshold {
            call(&hot, vec![Value::Int(0)]);
        }
        let custom = hot.custom_thunk().unwrap();
        keys.push(custom.key().clone());
        assert!(!ThunkTable::global().contains(custom.key()));
    }
    // a later handle at a reused address gets a fresh custom thunk, never a stale one
    let fresh = insert_arguments(&add(), 0, vec![Value::Int(-1)]).unwrap();
    assert!(fresh.custom_thunk().is_none());
    assert!(keys.iter().all(|k| !ThunkTable::global().contains(k)));
    assert!(ThunkTable::global().contains(&key_for(&fresh, false)));
}
