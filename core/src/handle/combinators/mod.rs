//! Argument and return transforms.
//!
//! Each constructor derives the combined type from its children and parameters and
//! validates it before a node is allocated, so a malformed request never yields a
//! handle.

use anyhow::Result;

use crate::convert::primitive_cast;
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::MethodHandle;

pub mod collect;
pub mod filter;
pub mod fold;
pub mod insert;
pub mod permute;
pub mod spread;

pub use collect::{collect_arguments, collect_into_array};
pub use filter::{filter_arguments, filter_return_value};
pub use fold::{fold_arguments, fold_arguments_with_indices};
pub use insert::insert_arguments;
pub use permute::{drop_arguments, drop_arguments_to_match, permute_arguments};
pub use spread::spread_arguments;

/// Explicit-cast adaptation; see [`MethodHandle::explicit_cast`].
pub fn explicit_cast_arguments(target: &MethodHandle, new_type: &MethodType) -> Result<MethodHandle> {
    target.explicit_cast(new_type)
}

/// Coerces a caller-supplied constant to `ty`: unboxing and widening for primitives,
/// boxing and an instance check for references.
pub(crate) fn coerce_constant(value: Value, ty: &JType) -> Result<Value> {
    if ty.is_primitive() {
        let prim = match value.as_object() {
            Some(obj) => obj.unbox().ok_or_else(|| {
                error::class_cast(format!("Cannot cast {} to {}", obj.class(), ty.wrapped()))
            })?,
            None if value.is_null() => {
                return Err(error::null_reference(format!("null cannot be bound to {ty}")));
            }
            None => value,
        };
        let Some(from) = prim.primitive_type() else {
            return Err(error::class_cast(format!("{prim:?} cannot be bound to {ty}")));
        };
        if from == *ty {
            return Ok(prim);
        }
        if !from.widens_to(ty) {
            return Err(error::class_cast(format!("Cannot convert {from} to {ty}")));
        }
        return primitive_cast(&prim, ty);
    }
    let boxed = value.boxed();
    match (ty.class(), boxed.as_object()) {
        (Some(class), Some(obj)) if !class.is_assignable_from(obj.class()) => Err(error::class_cast(format!(
            "Cannot cast {} to {}",
            obj.class(),
            class
        ))),
        _ => Ok(boxed),
    }
}
