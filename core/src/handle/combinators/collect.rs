use anyhow::Result;

use crate::class::ClassRef;
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

use super::{drop_arguments, fold_arguments};
use crate::handle::{HandleKind, MethodHandle, Payload};

/// Replaces the array parameter at `position` with `count` parameters of the
/// array's component type. Every invocation allocates a fresh array.
pub fn collect_into_array(
    target: &MethodHandle,
    position: usize,
    array_class: &ClassRef,
    count: usize,
) -> Result<MethodHandle> {
    let ty = target.method_type();
    let Some(component) = array_class.component_type().cloned() else {
        return Err(error::illegal_argument(format!("{array_class} is not an array class")));
    };
    let accepts = ty
        .parameter_type(position)
        .and_then(JType::class)
        .is_some_and(|p| p.is_assignable_from(array_class));
    if !accepts {
        return Err(error::illegal_argument(format!(
            "parameter {position} of {ty} does not accept {array_class}"
        )));
    }
    let mut params = Vec::with_capacity(ty.parameter_count() + count);
    params.extend_from_slice(&ty.parameters()[..position]);
    params.extend(std::iter::repeat_n(component.clone(), count));
    params.extend_from_slice(&ty.parameters()[position + 1..]);
    let new_type = MethodType::new(ty.return_type().clone(), params)?;
    MethodHandle::from_parts(
        new_type,
        HandleKind::Collect,
        Payload::Collect {
            next: target.clone(),
            position,
            count,
            component,
        },
    )
}

/// Runs `filter` over the arguments starting at `position`. A non-void result
/// replaces that run as the target's argument at `position`; a void filter only
/// consumes it.
pub fn collect_arguments(target: &MethodHandle, position: usize, filter: &MethodHandle) -> Result<MethodHandle> {
    let ty = target.method_type();
    let filter_type = filter.method_type();
    let rtype = filter_type.return_type();
    if rtype.is_void() {
        if position > ty.parameter_count() {
            return Err(error::illegal_argument(format!("collect position {position} out of range for {ty}")));
        }
        let widened = drop_arguments(target, position, filter_type.parameters())?;
        return fold_arguments(&widened, position, filter);
    }
    if ty.parameter_type(position) != Some(rtype) {
        return Err(error::illegal_argument(format!(
            "collector {filter_type} does not produce parameter {position} of {ty}"
        )));
    }
    let widened = drop_arguments(target, position + 1, filter_type.parameters())?;
    fold_arguments(&widened, position, filter)
}

pub(crate) fn invoke(
    next: &MethodHandle,
    position: usize,
    count: usize,
    component: &JType,
    mut args: Vec<Value>,
) -> Result<Value> {
    let elements: Vec<Value> = args.drain(position..position + count).collect();
    args.insert(position, Value::object(ObjRef::array_from(component, elements)));
    next.invoke_basic(args)
}
