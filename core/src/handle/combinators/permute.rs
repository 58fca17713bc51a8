use std::sync::Arc;

use anyhow::Result;

use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use crate::handle::{HandleKind, MethodHandle, Payload};

/// Reorders, duplicates or drops arguments: the target's parameter `i` receives the
/// outer argument `reorder[i]`. Permuting a permute composes the two vectors into a
/// single node.
pub fn permute_arguments(target: &MethodHandle, new_type: &MethodType, reorder: &[usize]) -> Result<MethodHandle> {
    let ty = target.method_type();
    if reorder.len() != ty.parameter_count() {
        return Err(error::illegal_argument(format!(
            "reorder vector has {} entries but {} has {} parameters",
            reorder.len(),
            ty,
            ty.parameter_count()
        )));
    }
    if new_type.return_type() != ty.return_type() {
        return Err(error::illegal_argument(format!(
            "return types differ: {} vs {}",
            new_type, ty
        )));
    }
    for (i, &source) in reorder.iter().enumerate() {
        match new_type.parameter_type(source) {
            Some(p) if p == &ty.parameters()[i] => {}
            Some(p) => {
                return Err(error::illegal_argument(format!(
                    "parameter {i} of {ty} is {} but reorder picks {p}",
                    ty.parameters()[i]
                )));
            }
            None => {
                return Err(error::illegal_argument(format!(
                    "reorder index {source} out of range for {new_type}"
                )));
            }
        }
    }
    if new_type == ty && reorder.iter().enumerate().all(|(i, &s)| i == s) {
        return Ok(target.clone());
    }
    let (next, combined): (MethodHandle, Vec<usize>) = match target.payload() {
        Payload::Permute { next, reorder: inner } => (next.clone(), inner.iter().map(|&i| reorder[i]).collect()),
        _ => (target.clone(), reorder.to_vec()),
    };
    MethodHandle::from_parts(
        new_type.clone(),
        HandleKind::Permute,
        Payload::Permute {
            next,
            reorder: Arc::from(combined),
        },
    )
}

/// Adds ignored parameters of `types` at `position`.
pub fn drop_arguments(target: &MethodHandle, position: usize, types: &[JType]) -> Result<MethodHandle> {
    let ty = target.method_type();
    if position > ty.parameter_count() {
        return Err(error::illegal_argument(format!("drop position {position} out of range for {ty}")));
    }
    if types.is_empty() {
        return Ok(target.clone());
    }
    let new_type = ty.insert_parameter_types(position, types)?;
    let reorder: Vec<usize> = (0..ty.parameter_count())
        .map(|i| if i < position { i } else { i + types.len() })
        .collect();
    permute_arguments(target, &new_type, &reorder)
}

/// Adapts `target` to take `new_types` after its first `skip` parameters. The
/// remaining target parameters must appear in `new_types` starting at `position`;
/// every other entry of `new_types` is ignored.
pub fn drop_arguments_to_match(
    target: &MethodHandle,
    skip: usize,
    new_types: &[JType],
    position: usize,
) -> Result<MethodHandle> {
    let ty = target.method_type();
    let count = ty.parameter_count();
    if skip > count {
        return Err(error::illegal_argument(format!("skip count {skip} out of range for {ty}")));
    }
    let kept = count - skip;
    if position + kept > new_types.len() {
        return Err(error::illegal_argument(format!(
            "position {position} leaves no room for the last {kept} parameters of {ty}"
        )));
    }
    if new_types.iter().any(JType::is_void) {
        return Err(error::illegal_argument("void is not a parameter type"));
    }
    if ty.parameters()[skip..] != new_types[position..position + kept] {
        return Err(error::illegal_argument(format!(
            "parameters of {ty} after {skip} do not match the new types at {position}"
        )));
    }
    let mut params = ty.parameters()[..skip].to_vec();
    params.extend_from_slice(new_types);
    let new_type = MethodType::new(ty.return_type().clone(), params)?;
    let reorder: Vec<usize> = (0..count)
        .map(|i| if i < skip { i } else { i + position })
        .collect();
    permute_arguments(target, &new_type, &reorder)
}

pub(crate) fn invoke(next: &MethodHandle, reorder: &[usize], args: Vec<Value>) -> Result<Value> {
    let permuted = reorder.iter().map(|&i| args[i].clone()).collect();
    next.invoke_basic(permuted)
}
