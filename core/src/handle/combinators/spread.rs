use anyhow::Result;

use crate::class::ClassRef;
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use crate::handle::{HandleKind, MethodHandle, Payload};

/// Replaces `count` parameters at `position` with one `array_class` parameter whose
/// elements are spread back into them. Target parameters that differ from the
/// component type are adapted first.
pub fn spread_arguments(
    target: &MethodHandle,
    position: usize,
    array_class: &ClassRef,
    count: usize,
) -> Result<MethodHandle> {
    let ty = target.method_type();
    let Some(component) = array_class.component_type().cloned() else {
        return Err(error::illegal_argument(format!("{array_class} is not an array class")));
    };
    if position + count > ty.parameter_count() {
        return Err(error::illegal_argument(format!(
            "cannot spread {count} arguments at {position} of {ty}"
        )));
    }
    let needs_adapt = ty.parameters()[position..position + count].iter().any(|p| *p != component);
    let next = if needs_adapt {
        let mut params = ty.parameters().to_vec();
        params[position..position + count].fill(component.clone());
        target.as_type(&MethodType::new(ty.return_type().clone(), params)?)?
    } else {
        target.clone()
    };
    let mut params = Vec::with_capacity(ty.parameter_count() + 1 - count);
    params.extend_from_slice(&ty.parameters()[..position]);
    params.push(JType::of(array_class));
    params.extend_from_slice(&ty.parameters()[position + count..]);
    let new_type = MethodType::new(ty.return_type().clone(), params)?;
    MethodHandle::from_parts(
        new_type,
        HandleKind::Spread,
        Payload::Spread {
            next,
            position,
            count,
            array_class: array_class.clone(),
        },
    )
}

/// The array is validated in full before the target runs.
pub(crate) fn invoke(
    next: &MethodHandle,
    position: usize,
    count: usize,
    array_class: &ClassRef,
    mut args: Vec<Value>,
) -> Result<Value> {
    let array = args.remove(position);
    let elements = match array.as_object() {
        None if count == 0 => Vec::new(),
        None => return Err(error::illegal_argument(format!("cannot spread null into {count} arguments"))),
        Some(obj) => {
            if !array_class.is_assignable_from(obj.class()) {
                return Err(error::illegal_argument(format!("{} is not a {}", obj.class(), array_class)));
            }
            let elements = obj
                .array_elements()
                .ok_or_else(|| error::illegal_argument(format!("{} is not an array", obj.class())))?;
            if elements.len() != count {
                return Err(error::illegal_argument(format!(
                    "array is not of length {count}: found {}",
                    elements.len()
                )));
            }
            elements
        }
    };
    args.splice(position..position, elements);
    next.invoke_basic(args)
}
