//! Per-argument conversions used by `as_type` and `explicit_cast_arguments`.
//!
//! Ordinary conversions allow primitive widening, boxing, unboxing followed by
//! widening, and checked reference casts. Explicit casts additionally allow
//! primitive narrowing, boolean truncation (`x & 1`), null-to-zero unboxing and
//! unchecked casts to interfaces.

use anyhow::Result;

use crate::error;
use crate::types::JType;
use crate::value::Value;

/// Whether a value of `from` can be converted to `to` at all. Reference casts and
/// unboxing from a non-wrapper type may still fail at call time.
pub fn can_convert(from: &JType, to: &JType, explicit: bool) -> bool {
    if from == to || from.is_void() || to.is_void() {
        return true;
    }
    match (from.is_primitive(), to.is_primitive()) {
        (true, true) => explicit || from.widens_to(to),
        (true, false) => {
            let Some(wrapper) = from.wrapper_class() else { return false };
            to.class().is_some_and(|c| c.is_assignable_from(&wrapper))
        }
        (false, true) => match from.unwrapped() {
            Some(prim) => explicit || prim == *to || prim.widens_to(to),
            None => {
                explicit
                    || match (from.class(), to.wrapper_class()) {
                        (Some(src), Some(wrapper)) => src.is_assignable_from(&wrapper),
                        _ => false,
                    }
            }
        },
        (false, false) => true,
    }
}

/// Converts a return value. Anything converts to void; void produces null or zero.
pub fn convert_return(value: Value, from: &JType, to: &JType, explicit: bool) -> Result<Value> {
    if to.is_void() {
        return Ok(Value::Void);
    }
    if from.is_void() {
        return Ok(Value::zero(to));
    }
    convert_value(value, from, to, explicit)
}

pub fn convert_value(value: Value, from: &JType, to: &JType, explicit: bool) -> Result<Value> {
    if from == to {
        return Ok(value);
    }
    match (from.is_primitive(), to.is_primitive()) {
        (true, true) => {
            if !explicit && !from.widens_to(to) {
                return Err(error::wrong_method_type(format!("cannot convert {from} to {to}")));
            }
            primitive_cast(&value, to)
        }
        (true, false) => {
            let boxed = value.boxed();
            check_cast(boxed, to, explicit)
        }
        (false, true) => unbox(value, to, explicit),
        (false, false) => check_cast(value, to, explicit),
    }
}

fn check_cast(value: Value, to: &JType, explicit: bool) -> Result<Value> {
    let Some(target) = to.class() else {
        return Ok(value);
    };
    match value.as_object() {
        None => Ok(value),
        Some(obj) if target.is_assignable_from(obj.class()) => Ok(value),
        Some(_) if explicit && target.is_interface() => Ok(value),
        Some(obj) => Err(error::class_cast(format!(
            "Cannot cast {} to {}",
            obj.class(),
            target
        ))),
    }
}

fn unbox(value: Value, to: &JType, explicit: bool) -> Result<Value> {
    let Some(obj) = value.as_object() else {
        if explicit {
            return Ok(Value::zero(to));
        }
        return Err(error::null_reference(format!("cannot unbox null value to {to}")));
    };
    let Some(inner) = obj.unbox() else {
        return Err(error::class_cast(format!("Cannot cast {} to {}", obj.class(), to.wrapped())));
    };
    let Some(prim) = inner.primitive_type() else {
        return Err(error::class_cast(format!("{} does not box a primitive", obj.class())));
    };
    if prim == *to {
        return Ok(inner);
    }
    if !explicit && !prim.widens_to(to) {
        return Err(error::class_cast(format!(
            "Cannot cast {} to {}",
            obj.class(),
            to.wrapped()
        )));
    }
    primitive_cast(&inner, to)
}

enum Numeric {
    Integral(i64),
    Floating(f64),
}

fn numeric(value: &Value) -> Result<Numeric> {
    Ok(match value {
        Value::Boolean(b) => Numeric::Integral(i64::from(*b)),
        Value::Byte(v) => Numeric::Integral(i64::from(*v)),
        Value::Char(v) => Numeric::Integral(i64::from(*v)),
        Value::Short(v) => Numeric::Integral(i64::from(*v)),
        Value::Int(v) => Numeric::Integral(i64::from(*v)),
        Value::Long(v) => Numeric::Integral(*v),
        Value::Float(v) => Numeric::Floating(f64::from(*v)),
        Value::Double(v) => Numeric::Floating(*v),
        other => return Err(error::class_cast(format!("{other:?} is not a primitive value"))),
    })
}

/// Java casting conversion between primitives. Floating to sub-int goes through
/// `int` first; booleans keep only the low bit.
pub fn primitive_cast(value: &Value, to: &JType) -> Result<Value> {
    let n = numeric(value)?;
    let as_int = |n: &Numeric| match *n {
        Numeric::Integral(i) => i as i32,
        Numeric::Floating(f) => f as i32,
    };
    Ok(match to {
        JType::Boolean => Value::Boolean(as_int(&n) & 1 != 0),
        JType::Byte => Value::Byte(as_int(&n) as i8),
        JType::Char => Value::Char(as_int(&n) as u16),
        JType::Short => Value::Short(as_int(&n) as i16),
        JType::Int => Value::Int(as_int(&n)),
        JType::Long => Value::Long(match n {
            Numeric::Integral(i) => i,
            Numeric::Floating(f) => f as i64,
        }),
        JType::Float => Value::Float(match n {
            Numeric::Integral(i) => i as f32,
            Numeric::Floating(f) => f as f32,
        }),
        JType::Double => Value::Double(match n {
            Numeric::Integral(i) => i as f64,
            Numeric::Floating(f) => f,
        }),
        other => return Err(error::class_cast(format!("{other} is not a primitive type"))),
    })
}
