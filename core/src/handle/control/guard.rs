use anyhow::Result;

use crate::error;
use crate::types::JType;
use crate::value::Value;

use super::is_parameter_prefix;
use crate::handle::{HandleKind, MethodHandle, Payload};

/// Dispatches to `target` or `fallback` on the boolean result of `test`, which sees
/// a prefix of the arguments. Both branches receive the full argument list.
pub fn guard_with_test(test: &MethodHandle, target: &MethodHandle, fallback: &MethodHandle) -> Result<MethodHandle> {
    let ty = target.method_type();
    let tt = test.method_type();
    if fallback.method_type() != ty {
        return Err(error::illegal_argument(format!(
            "target and fallback types differ: {} vs {}",
            ty,
            fallback.method_type()
        )));
    }
    if *tt.return_type() != JType::Boolean || !is_parameter_prefix(tt, ty) {
        return Err(error::illegal_argument(format!("guard {tt} does not fit {ty}")));
    }
    MethodHandle::from_parts(
        ty.clone(),
        HandleKind::GuardWithTest,
        Payload::GuardWithTest {
            guard: test.clone(),
            true_target: target.clone(),
            false_target: fallback.clone(),
        },
    )
}

pub(crate) fn invoke(
    guard: &MethodHandle,
    true_target: &MethodHandle,
    false_target: &MethodHandle,
    args: Vec<Value>,
) -> Result<Value> {
    let count = guard.method_type().parameter_count();
    let passed = guard.invoke_basic(args[..count].to_vec())?.as_bool()?;
    if passed {
        true_target.invoke_basic(args)
    } else {
        false_target.invoke_basic(args)
    }
}
