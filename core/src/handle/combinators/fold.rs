use std::sync::Arc;

use anyhow::Result;

use crate::error;
use crate::value::Value;

use crate::handle::{HandleKind, MethodHandle, Payload};

/// Runs `combiner` over the arguments starting at `position`; a non-void result is
/// inserted as the target's argument at `position`.
pub fn fold_arguments(target: &MethodHandle, position: usize, combiner: &MethodHandle) -> Result<MethodHandle> {
    let count = combiner.method_type().parameter_count();
    let indices: Vec<usize> = (position..position + count).collect();
    fold_arguments_with_indices(target, position, combiner, &indices)
}

/// Like [`fold_arguments`] with the combiner reading outer arguments `indices`.
pub fn fold_arguments_with_indices(
    target: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
    indices: &[usize],
) -> Result<MethodHandle> {
    let ty = target.method_type();
    let ct = combiner.method_type();
    let rtype = ct.return_type();
    let outer = if rtype.is_void() {
        if position > ty.parameter_count() {
            return Err(error::illegal_argument(format!("fold position {position} out of range for {ty}")));
        }
        ty.clone()
    } else {
        if ty.parameter_type(position) != Some(rtype) {
            return Err(error::illegal_argument(format!(
                "combiner {ct} does not produce parameter {position} of {ty}"
            )));
        }
        ty.drop_parameter_types(position, position + 1)?
    };
    if indices.len() != ct.parameter_count() {
        return Err(error::illegal_argument(format!(
            "combiner {ct} takes {} arguments but {} indices were given",
            ct.parameter_count(),
            indices.len()
        )));
    }
    for (k, &index) in indices.iter().enumerate() {
        if outer.parameter_type(index) != Some(&ct.parameters()[k]) {
            return Err(error::illegal_argument(format!(
                "combiner parameter {k} of {ct} does not match argument {index} of {outer}"
            )));
        }
    }
    MethodHandle::from_parts(
        outer,
        HandleKind::Fold,
        Payload::Fold {
            next: target.clone(),
            position,
            combiner: combiner.clone(),
            indices: Arc::from(indices),
        },
    )
}

pub(crate) fn invoke(
    next: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
    indices: &[usize],
    mut args: Vec<Value>,
) -> Result<Value> {
    let folded = indices.iter().map(|&i| args[i].clone()).collect();
    let result = combiner.invoke_basic(folded)?;
    if !combiner.method_type().return_type().is_void() {
        args.insert(position, result);
    }
    next.invoke_basic(args)
}
