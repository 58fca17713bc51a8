use std::sync::Arc;

use anyhow::Result;

use crate::error;
use crate::method_type::MethodType;
use crate::value::Value;

use crate::handle::{HandleKind, MethodHandle, Payload};

/// Applies unary `filters[i]` to argument `start + i` before the target sees it.
/// Absent filters pass their argument through; leading and trailing absent
/// filters are trimmed, and an all-absent list returns the target.
pub fn filter_arguments(
    target: &MethodHandle,
    start: usize,
    filters: Vec<Option<MethodHandle>>,
) -> Result<MethodHandle> {
    let ty = target.method_type();
    if start + filters.len() > ty.parameter_count() {
        return Err(error::illegal_argument(format!(
            "{} filters at {start} exceed the parameters of {ty}",
            filters.len()
        )));
    }
    let Some(first) = filters.iter().position(Option::is_some) else {
        return Ok(target.clone());
    };
    let last = filters.iter().rposition(Option::is_some).unwrap_or(first);
    let start = start + first;
    let filters: Vec<Option<MethodHandle>> = filters[first..=last].to_vec();

    let mut params = ty.parameters().to_vec();
    for (i, filter) in filters.iter().enumerate() {
        let Some(filter) = filter else { continue };
        let ft = filter.method_type();
        let slot = start + i;
        if ft.parameter_count() != 1 || ft.return_type() != &ty.parameters()[slot] {
            return Err(error::illegal_argument(format!(
                "filter {ft} cannot feed parameter {slot} of {ty}"
            )));
        }
        params[slot] = ft.parameters()[0].clone();
    }
    let new_type = MethodType::new(ty.return_type().clone(), params)?;
    MethodHandle::from_parts(
        new_type,
        HandleKind::FilterArguments,
        Payload::FilterArguments {
            next: target.clone(),
            start,
            filters: Arc::from(filters),
        },
    )
}

/// Pipes the target's result through `filter`, which takes the result (or nothing
/// for a void target).
pub fn filter_return_value(target: &MethodHandle, filter: &MethodHandle) -> Result<MethodHandle> {
    let ty = target.method_type();
    let ft = filter.method_type();
    let fits = if ty.return_type().is_void() {
        ft.parameter_count() == 0
    } else {
        ft.parameter_count() == 1 && ft.parameters()[0] == *ty.return_type()
    };
    if !fits {
        return Err(error::illegal_argument(format!("return filter {ft} does not accept the result of {ty}")));
    }
    MethodHandle::from_parts(
        ty.change_return_type(ft.return_type().clone()),
        HandleKind::FilterReturn,
        Payload::FilterReturn {
            next: target.clone(),
            filter: filter.clone(),
        },
    )
}

pub(crate) fn invoke_arguments(
    next: &MethodHandle,
    start: usize,
    filters: &[Option<MethodHandle>],
    mut args: Vec<Value>,
) -> Result<Value> {
    for (i, filter) in filters.iter().enumerate() {
        if let Some(filter) = filter {
            let slot = start + i;
            let arg = std::mem::replace(&mut args[slot], Value::NULL);
            args[slot] = filter.invoke_basic(vec![arg])?;
        }
    }
    next.invoke_basic(args)
}

pub(crate) fn invoke_return(next: &MethodHandle, filter: &MethodHandle, args: Vec<Value>) -> Result<Value> {
    let result = next.invoke_basic(args)?;
    if next.method_type().return_type().is_void() {
        filter.invoke_basic(Vec::new())
    } else {
        filter.invoke_basic(vec![result])
    }
}
