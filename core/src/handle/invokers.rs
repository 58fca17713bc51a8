//! Invoker handles: a handle taking the handle (or var handle) to call as its
//! leading argument, and the dynamic invoker over a call site.

use anyhow::Result;

use crate::call_site::CallSiteRef;
use crate::class::{ClassRef, well_known};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;
use crate::var_handle::AccessMode;

use super::{HandleKind, MethodHandle, Payload, require_object};

fn with_leading(class: &ClassRef, ty: &MethodType) -> Result<MethodType> {
    ty.insert_parameter_types(0, &[JType::of(class)])
}

/// `(MethodHandle, A...)R` calling its first argument exactly with `ty`.
pub fn exact_invoker(ty: &MethodType) -> Result<MethodHandle> {
    MethodHandle::from_parts(
        with_leading(&well_known().method_handle, ty)?,
        HandleKind::InvokeExact,
        Payload::Invoker { next_type: ty.clone() },
    )
}

/// `(MethodHandle, A...)R` calling its first argument through `as_type`.
pub fn invoker(ty: &MethodType) -> Result<MethodHandle> {
    MethodHandle::from_parts(
        with_leading(&well_known().method_handle, ty)?,
        HandleKind::InvokeGeneric,
        Payload::Invoker { next_type: ty.clone() },
    )
}

/// An invoker taking `leading` arguments as-is and the rest from an `Object[]`.
pub fn spread_invoker(ty: &MethodType, leading: usize) -> Result<MethodHandle> {
    let Some(count) = ty.parameter_count().checked_sub(leading) else {
        return Err(error::illegal_argument(format!("{leading} leading arguments exceed {ty}")));
    };
    let array = ClassRef::array_of(&JType::object());
    invoker(ty)?.as_spreader(1 + leading, &array, count)
}

pub fn dynamic_invoker(site: &CallSiteRef) -> Result<MethodHandle> {
    site.dynamic_invoker()
}

/// `(VarHandle, A...)R` performing `mode` exactly with `ty`.
pub fn var_handle_exact_invoker(mode: AccessMode, ty: &MethodType) -> Result<MethodHandle> {
    MethodHandle::from_parts(
        with_leading(&well_known().var_handle, ty)?,
        HandleKind::VarHandleInvokeExact,
        Payload::VarHandleInvoker {
            mode,
            mode_type: ty.clone(),
        },
    )
}

/// `(VarHandle, A...)R` performing `mode` with argument conversion.
pub fn var_handle_invoker(mode: AccessMode, ty: &MethodType) -> Result<MethodHandle> {
    MethodHandle::from_parts(
        with_leading(&well_known().var_handle, ty)?,
        HandleKind::VarHandleInvokeGeneric,
        Payload::VarHandleInvoker {
            mode,
            mode_type: ty.clone(),
        },
    )
}

pub(super) fn invoke_handle(invoker: &MethodHandle, next_type: &MethodType, mut args: Vec<Value>) -> Result<Value> {
    let first = args.remove(0);
    let object = require_object(&first, "method handle")?;
    let target = object
        .as_handle()
        .ok_or_else(|| error::class_cast(format!("{} cannot be cast to MethodHandle", object.class())))?;
    match invoker.kind() {
        HandleKind::InvokeExact => target.invoke_exact(next_type, args),
        _ => target.invoke(next_type, args),
    }
}

pub(super) fn invoke_site(_invoker: &MethodHandle, site: &CallSiteRef, args: Vec<Value>) -> Result<Value> {
    site.target()?.invoke_basic(args)
}

pub(super) fn invoke_var_handle(
    invoker: &MethodHandle,
    mode: AccessMode,
    mode_type: &MethodType,
    mut args: Vec<Value>,
) -> Result<Value> {
    let first = args.remove(0);
    let object = require_object(&first, "var handle")?;
    let vh = object
        .as_var_handle()
        .ok_or_else(|| error::class_cast(format!("{} cannot be cast to VarHandle", object.class())))?;
    match invoker.kind() {
        HandleKind::VarHandleInvokeExact => vh.invoke_exact(mode, mode_type, args),
        _ => vh.invoke(mode, mode_type, args),
    }
}
