use std::sync::Arc;

use anyhow::Result;

use crate::error;
use crate::value::Value;

use super::coerce_constant;
use crate::handle::{HandleKind, MethodHandle, Payload};

/// Fixes `values` at parameter positions `position..position + values.len()`.
pub fn insert_arguments(target: &MethodHandle, position: usize, values: Vec<Value>) -> Result<MethodHandle> {
    let ty = target.method_type();
    let end = position + values.len();
    if end > ty.parameter_count() {
        return Err(error::illegal_argument(format!(
            "cannot insert {} values at {} into {}",
            values.len(),
            position,
            ty
        )));
    }
    if values.is_empty() {
        return Ok(target.clone());
    }
    let mut coerced = Vec::with_capacity(values.len());
    for (value, param) in values.into_iter().zip(&ty.parameters()[position..end]) {
        coerced.push(coerce_constant(value, param)?);
    }
    let new_type = ty.drop_parameter_types(position, end)?;
    MethodHandle::from_parts(
        new_type,
        HandleKind::Insert,
        Payload::Insert {
            next: target.clone(),
            position,
            values: Arc::from(coerced),
        },
    )
}

pub(crate) fn invoke(next: &MethodHandle, position: usize, values: &[Value], mut args: Vec<Value>) -> Result<Value> {
    args.splice(position..position, values.iter().cloned());
    next.invoke_basic(args)
}
