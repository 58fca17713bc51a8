//! Type adaptation: `as_type`, explicit casts, receiver binding and arity changes.

use anyhow::Result;

use crate::class::ClassRef;
use crate::convert::{can_convert, convert_return, convert_value};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::util::sync::lock;
use crate::value::Value;

use super::combinators::{collect, insert, spread};
use super::primitive::is_static_member;
use super::{HandleKind, MethodHandle, Payload};

impl MethodHandle {
    /// A handle of `new_type` that converts arguments and return value around this
    /// one. The most recent adaptation is cached.
    pub fn as_type(&self, new_type: &MethodType) -> Result<MethodHandle> {
        if *new_type == self.0.ty {
            return Ok(self.clone());
        }
        let cached = lock(&self.0.as_type_cache)
            .as_ref()
            .and_then(MethodHandle::upgrade)
            .filter(|h| h.method_type() == new_type);
        if let Some(hit) = cached {
            return Ok(hit);
        }
        let adapted = match self.payload() {
            Payload::VarargsCollector { next, array_class } => varargs_as_type(self, next, array_class, new_type)?,
            _ => self.convert(new_type, false)?,
        };
        *lock(&self.0.as_type_cache) = Some(adapted.downgrade());
        Ok(adapted)
    }

    /// Like [`MethodHandle::as_type`] but also allows narrowing, boolean truncation,
    /// null-to-zero unboxing and unchecked interface casts.
    pub fn explicit_cast(&self, new_type: &MethodType) -> Result<MethodHandle> {
        if *new_type == self.0.ty {
            return Ok(self.clone());
        }
        self.convert(new_type, true)
    }

    pub(crate) fn convert(&self, new_type: &MethodType, explicit: bool) -> Result<MethodHandle> {
        let old = &self.0.ty;
        if old == new_type {
            return Ok(self.clone());
        }
        let mismatch = || error::wrong_method_type(format!("cannot convert {} to {}", old, new_type));
        if old.parameter_count() != new_type.parameter_count() {
            return Err(mismatch());
        }
        for (from, to) in new_type.parameters().iter().zip(old.parameters()) {
            if !can_convert(from, to, explicit) {
                return Err(mismatch());
            }
        }
        if !can_convert(old.return_type(), new_type.return_type(), explicit) {
            return Err(mismatch());
        }
        let kind = if explicit { HandleKind::ExplicitCast } else { HandleKind::AsType };
        Self::from_parts(new_type.clone(), kind, Payload::Convert { next: self.clone() })
    }

    /// Binds the leading reference parameter. Direct instance-method handles get a
    /// receiver-bound node; everything else an insert.
    pub fn bind_to(&self, receiver: Value) -> Result<MethodHandle> {
        let first = self
            .0
            .ty
            .parameter_type(0)
            .filter(|p| p.is_reference())
            .ok_or_else(|| error::illegal_argument(format!("{} has no leading reference parameter", self.0.ty)))?;
        if let (Some(class), Some(obj)) = (first.class(), receiver.as_object())
            && !class.is_assignable_from(obj.class())
        {
            return Err(error::class_cast(format!("Cannot cast {} to {}", obj.class(), class)));
        }
        match self.payload() {
            Payload::Primitive(target)
                if !is_static_member(target)
                    && matches!(
                        self.kind(),
                        HandleKind::Virtual | HandleKind::Special | HandleKind::Interface
                    ) =>
            {
                let ty = self.0.ty.drop_parameter_types(0, 1)?;
                Self::from_parts(
                    ty,
                    HandleKind::Bound,
                    Payload::Bound {
                        next: self.clone(),
                        receiver,
                    },
                )
            }
            _ => insert::insert_arguments(self, 0, vec![receiver]),
        }
    }

    /// A handle that collects trailing arguments into `array_class` when adapted
    /// with `as_type`; exact invocation is unchanged.
    pub fn as_varargs_collector(&self, array_class: &ClassRef) -> Result<MethodHandle> {
        if !array_class.is_array() {
            return Err(error::illegal_argument(format!("{array_class} is not an array class")));
        }
        let accepts = self
            .0
            .ty
            .last_parameter_type()
            .and_then(|p| p.class())
            .is_some_and(|last| last.is_assignable_from(array_class));
        if !accepts {
            return Err(error::illegal_argument(format!(
                "last parameter of {} does not accept {}",
                self.0.ty, array_class
            )));
        }
        if let Payload::VarargsCollector { array_class: existing, .. } = self.payload()
            && existing == array_class
        {
            return Ok(self.clone());
        }
        Self::from_parts(
            self.0.ty.clone(),
            HandleKind::VarargsCollect,
            Payload::VarargsCollector {
                next: self.as_fixed_arity(),
                array_class: array_class.clone(),
            },
        )
    }

    pub fn as_fixed_arity(&self) -> MethodHandle {
        match self.payload() {
            Payload::VarargsCollector { next, .. } => next.clone(),
            _ => self.clone(),
        }
    }

    pub fn is_varargs_collector(&self) -> bool {
        matches!(self.payload(), Payload::VarargsCollector { .. })
    }

    /// Spreads one array argument at `position` into `count` trailing parameters.
    pub fn as_spreader(&self, position: usize, array_class: &ClassRef, count: usize) -> Result<MethodHandle> {
        spread::spread_arguments(self, position, array_class, count)
    }

    /// Collects `count` arguments at `position` into a fresh `array_class` array.
    pub fn as_collector(&self, position: usize, array_class: &ClassRef, count: usize) -> Result<MethodHandle> {
        collect::collect_into_array(self, position, array_class, count)
    }
}

fn varargs_as_type(
    handle: &MethodHandle,
    fixed: &MethodHandle,
    array_class: &ClassRef,
    new_type: &MethodType,
) -> Result<MethodHandle> {
    let ty = handle.method_type();
    let fixed_count = ty.parameter_count() - 1;
    let passes_array = new_type.parameter_count() == ty.parameter_count()
        && new_type
            .last_parameter_type()
            .is_some_and(|last| JType::of(array_class).is_assignable_from(last));
    if passes_array {
        return fixed.convert(new_type, false);
    }
    let Some(count) = new_type.parameter_count().checked_sub(fixed_count) else {
        return Err(error::wrong_method_type(format!(
            "cannot convert varargs {} to {}",
            ty, new_type
        )));
    };
    collect::collect_into_array(fixed, fixed_count, array_class, count)?.convert(new_type, false)
}

pub(super) fn invoke_convert(handle: &MethodHandle, next: &MethodHandle, args: Vec<Value>) -> Result<Value> {
    let explicit = handle.kind() == HandleKind::ExplicitCast;
    let outer = handle.method_type();
    let inner = next.method_type();
    let mut converted = Vec::with_capacity(args.len());
    for ((arg, from), to) in args.into_iter().zip(outer.parameters()).zip(inner.parameters()) {
        converted.push(convert_value(arg, from, to, explicit)?);
    }
    let result = next.invoke_basic(converted)?;
    convert_return(result, inner.return_type(), outer.return_type(), explicit)
}

pub(super) fn invoke_bound(next: &MethodHandle, receiver: &Value, mut args: Vec<Value>) -> Result<Value> {
    if receiver.is_null() {
        return Err(error::null_reference("bound receiver is null"));
    }
    args.insert(0, receiver.clone());
    next.invoke_basic(args)
}
