//! Constant-shaped handles: constants, identity, zero/empty, throwers and array
//! accessors.

use anyhow::Result;

use crate::class::{ClassRef, well_known};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use super::combinators::{coerce_constant, drop_arguments};
use super::{HandleKind, MethodHandle, Payload, support};

/// `()T` always returning `value`. Primitive constants widen; reference constants
/// must be instances of `ty`.
pub fn constant(ty: &JType, value: Value) -> Result<MethodHandle> {
    if ty.is_void() {
        return Err(error::illegal_argument("constant of type void"));
    }
    if ty.is_primitive() && value.is_null() {
        return Err(error::illegal_argument(format!("null constant of primitive type {ty}")));
    }
    let value = coerce_constant(value, ty)?;
    let kind = match ty {
        JType::Long => HandleKind::ConstantLong,
        JType::Float => HandleKind::ConstantFloat,
        JType::Double => HandleKind::ConstantDouble,
        JType::Ref(_) => HandleKind::ConstantObject,
        _ => HandleKind::ConstantInt,
    };
    MethodHandle::from_parts(MethodType::method_type(ty.clone(), vec![]), kind, Payload::Constant(value))
}

/// `(T)T` returning its argument.
pub fn identity(ty: &JType) -> Result<MethodHandle> {
    if ty.is_void() {
        return Err(error::illegal_argument("identity of type void"));
    }
    support::identity()?.clone_with_new_type(MethodType::method_type(ty.clone(), vec![ty.clone()]))
}

/// `()T` returning the default value of `ty`; `()V` for void.
pub fn zero(ty: &JType) -> Result<MethodHandle> {
    if ty.is_void() {
        return support::nop();
    }
    constant(ty, Value::zero(ty))
}

/// A handle of `ty` ignoring its arguments and returning the default value.
pub fn empty(ty: &MethodType) -> Result<MethodHandle> {
    drop_arguments(&zero(ty.return_type())?, 0, ty.parameters())
}

/// `(E)R` throwing its argument.
pub fn throw_exception(rtype: &JType, exception: &ClassRef) -> Result<MethodHandle> {
    if !well_known().throwable.is_assignable_from(exception) {
        return Err(error::illegal_argument(format!("{exception} is not a throwable class")));
    }
    support::throw_exception()?.clone_with_new_type(MethodType::method_type(rtype.clone(), vec![JType::of(exception)]))
}

fn component_of(array_class: &ClassRef) -> Result<JType> {
    array_class
        .component_type()
        .cloned()
        .ok_or_else(|| error::illegal_argument(format!("{array_class} is not an array class")))
}

/// `(T[],int)T`
pub fn array_element_getter(array_class: &ClassRef) -> Result<MethodHandle> {
    let component = component_of(array_class)?;
    support::array_get()?.clone_with_new_type(MethodType::method_type(
        component,
        vec![JType::of(array_class), JType::Int],
    ))
}

/// `(T[],int,T)void`
pub fn array_element_setter(array_class: &ClassRef) -> Result<MethodHandle> {
    let component = component_of(array_class)?;
    support::array_set()?.clone_with_new_type(MethodType::method_type(
        JType::Void,
        vec![JType::of(array_class), JType::Int, component],
    ))
}

/// `(int)T[]`
pub fn array_constructor(array_class: &ClassRef) -> Result<MethodHandle> {
    component_of(array_class)?;
    support::new_array(array_class)
}

/// `(T[])int`
pub fn array_length(array_class: &ClassRef) -> Result<MethodHandle> {
    component_of(array_class)?;
    support::array_length()?.clone_with_new_type(MethodType::method_type(JType::Int, vec![JType::of(array_class)]))
}
