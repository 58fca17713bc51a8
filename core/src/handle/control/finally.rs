use anyhow::Result;

use crate::class::well_known;
use crate::error::{self, throwable_of};
use crate::types::JType;
use crate::value::Value;

use super::is_parameter_prefix;
use crate::handle::{HandleKind, MethodHandle, Payload};

/// Runs `cleanup` after `target` whether it returned or threw.
///
/// `cleanup` takes the throwable (null on normal return), then the target's result
/// when the type is non-void (a zero placeholder when it threw), then a prefix of
/// the arguments. A normal return yields cleanup's result; a pending throwable is
/// rethrown after cleanup returns; a throwable from cleanup replaces it.
pub fn try_finally(target: &MethodHandle, cleanup: &MethodHandle) -> Result<MethodHandle> {
    let ty = target.method_type();
    let ct = cleanup.method_type();
    let rtype = ty.return_type();
    let leading = if rtype.is_void() { 1 } else { 2 };
    let shape_ok = ct.return_type() == rtype
        && ct.parameter_type(0) == Some(&JType::of(&well_known().throwable))
        && (rtype.is_void() || ct.parameter_type(1) == Some(rtype))
        && ct.parameter_count() >= leading
        && is_parameter_prefix(&ct.drop_parameter_types(0, leading)?, ty);
    if !shape_ok {
        return Err(error::illegal_argument(format!("cleanup {ct} does not fit target {ty}")));
    }
    MethodHandle::from_parts(
        ty.clone(),
        HandleKind::Finally,
        Payload::Finally {
            try_target: target.clone(),
            cleanup: cleanup.clone(),
        },
    )
}

pub(crate) fn invoke(try_target: &MethodHandle, cleanup: &MethodHandle, args: Vec<Value>) -> Result<Value> {
    let rtype = try_target.method_type().return_type().clone();
    let outcome = try_target.invoke_basic(args.clone());
    let (thrown, result) = match &outcome {
        Ok(value) => (Value::NULL, value.clone()),
        Err(err) => match throwable_of(err) {
            Some(t) => (t.to_value(), Value::zero(&rtype)),
            None => return outcome,
        },
    };
    let leading = if rtype.is_void() { 1 } else { 2 };
    let prefix = cleanup.method_type().parameter_count() - leading;
    let mut cleanup_args = Vec::with_capacity(prefix + leading);
    cleanup_args.push(thrown);
    if !rtype.is_void() {
        cleanup_args.push(result);
    }
    cleanup_args.extend(args.into_iter().take(prefix));
    let cleaned = cleanup.invoke_basic(cleanup_args)?;
    outcome.map(|_| cleaned)
}
