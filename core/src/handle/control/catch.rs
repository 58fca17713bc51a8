use anyhow::Result;

use crate::class::{ClassRef, well_known};
use crate::error::{self, throwable_of};
use crate::types::JType;
use crate::value::Value;

use super::is_parameter_prefix;
use crate::handle::{HandleKind, MethodHandle, Payload};

/// Invokes `target`; a throwable of `exception` goes to `handler` together with a
/// prefix of the original arguments. Anything else propagates untouched.
pub fn catch_exception(target: &MethodHandle, exception: &ClassRef, handler: &MethodHandle) -> Result<MethodHandle> {
    let ty = target.method_type();
    let ht = handler.method_type();
    if !well_known().throwable.is_assignable_from(exception) {
        return Err(error::illegal_argument(format!("{exception} is not a throwable class")));
    }
    if ht.return_type() != ty.return_type() {
        return Err(error::illegal_argument(format!("handler {ht} and target {ty} return different types")));
    }
    let caught = ht.parameter_type(0).is_some_and(|p| *p == JType::of(exception));
    if !caught || !is_parameter_prefix(&ht.drop_parameter_types(0, 1)?, ty) {
        return Err(error::illegal_argument(format!(
            "handler {ht} must take {exception} followed by a prefix of {ty}"
        )));
    }
    MethodHandle::from_parts(
        ty.clone(),
        HandleKind::Catch,
        Payload::Catch {
            try_target: target.clone(),
            handler: handler.clone(),
            exception: exception.clone(),
        },
    )
}

pub(crate) fn invoke(
    try_target: &MethodHandle,
    handler: &MethodHandle,
    exception: &ClassRef,
    args: Vec<Value>,
) -> Result<Value> {
    let err = match try_target.invoke_basic(args.clone()) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let thrown = match throwable_of(&err) {
        Some(t) if t.is_instance_of(exception) => t.to_value(),
        _ => return Err(err),
    };
    let prefix = handler.method_type().parameter_count() - 1;
    let mut handler_args = Vec::with_capacity(prefix + 1);
    handler_args.push(thrown);
    handler_args.extend(args.into_iter().take(prefix));
    handler.invoke_basic(handler_args)
}
