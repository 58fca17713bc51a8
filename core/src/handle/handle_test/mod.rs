use once_cell::sync::Lazy;

use crate::class::flags::*;
use crate::class::{ClassBuilder, ClassRef, well_known};
use crate::error;
use crate::lookup::Lookup;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

use super::MethodHandle;

mod adapt;
mod combinators;
mod constants;
mod control;
mod loops;
mod redefine;
mod scenarios;
mod thunks;

pub(super) fn ints(n: usize) -> MethodType {
    MethodType::method_type(JType::Int, vec![JType::Int; n])
}

pub(super) fn int_array() -> ClassRef {
    ClassRef::array_of(&JType::Int)
}

pub(super) fn int_array_value(values: &[i32]) -> Value {
    Value::object(ObjRef::array_from(&JType::Int, values.iter().copied().map(Value::Int).collect()))
}

pub(super) fn string_array() -> ClassRef {
    ClassRef::array_of(&JType::string())
}

fn str_arg(value: &Value) -> String {
    value
        .as_object()
        .and_then(|o| o.as_str())
        .unwrap_or("null")
        .to_string()
}

/// Static helpers shared by the handle tests.
static OPS: Lazy<ClassRef> = Lazy::new(|| {
    let arithmetic = JType::of(&well_known().arithmetic);
    let string = JType::string();
    ClassBuilder::new("demo/Ops")
        .method("add", ints(2), ACC_PUBLIC | ACC_STATIC, |args| {
            Ok(Value::Int(args[0].as_int()? + args[1].as_int()?))
        })
        .method("digits", ints(3), ACC_PUBLIC | ACC_STATIC, |args| {
            Ok(Value::Int(args[0].as_int()? * 100 + args[1].as_int()? * 10 + args[2].as_int()?))
        })
        .method("neg", ints(1), ACC_PUBLIC | ACC_STATIC, |args| Ok(Value::Int(-args[0].as_int()?)))
        .method(
            "sum",
            MethodType::method_type(JType::Int, vec![JType::Int, JType::of(&int_array())]),
            ACC_PUBLIC | ACC_STATIC,
            |args| {
                let base = args[0].as_int()?;
                let elements = args[1].as_object().and_then(|o| o.array_elements()).unwrap_or_default();
                let mut total = base;
                for e in elements {
                    total += e.as_int()?;
                }
                Ok(Value::Int(total))
            },
        )
        .method("div", ints(2), ACC_PUBLIC | ACC_STATIC, |args| {
            let (a, b) = (args[0].as_int()?, args[1].as_int()?);
            if a < 0 {
                return Err(error::illegal_state("negative dividend"));
            }
            if b == 0 {
                return Err(error::raise(&well_known().arithmetic, "/ by zero"));
            }
            Ok(Value::Int(a / b))
        })
        .method(
            "recover",
            MethodType::method_type(JType::Int, vec![arithmetic, JType::Int]),
            ACC_PUBLIC | ACC_STATIC,
            |args| {
                let message = args[0].as_object().and_then(|o| o.throwable_message()).unwrap_or("");
                let bias = if message == "/ by zero" { 1000 } else { 0 };
                Ok(Value::Int(bias + args[1].as_int()?))
            },
        )
        .method(
            "isPositive",
            MethodType::method_type(JType::Boolean, vec![JType::Int]),
            ACC_PUBLIC | ACC_STATIC,
            |args| Ok(Value::Boolean(args[0].as_int()? > 0)),
        )
        .method(
            "concat",
            MethodType::method_type(string.clone(), vec![string.clone(), string.clone()]),
            ACC_PUBLIC | ACC_STATIC,
            |args| Ok(Value::string(&format!("{}{}", str_arg(&args[0]), str_arg(&args[1])))),
        )
        .method(
            "join",
            MethodType::method_type(string.clone(), vec![string.clone(), JType::of(&string_array())]),
            ACC_PUBLIC | ACC_STATIC,
            |args| {
                let parts: Vec<String> = args[1]
                    .as_object()
                    .and_then(|o| o.array_elements())
                    .unwrap_or_default()
                    .iter()
                    .map(str_arg)
                    .collect();
                Ok(Value::string(&parts.join(&str_arg(&args[0]))))
            },
        )
        .build()
});

pub(super) fn ops() -> &'static ClassRef {
    &OPS
}

pub(super) fn op(name: &str, ty: &MethodType) -> MethodHandle {
    Lookup::new(ops()).find_static(ops(), name, ty).unwrap()
}

pub(super) fn add() -> MethodHandle {
    op("add", &ints(2))
}

pub(super) fn digits() -> MethodHandle {
    op("digits", &ints(3))
}

pub(super) fn call(handle: &MethodHandle, args: Vec<Value>) -> Value {
    handle.invoke_exact(handle.method_type(), args).unwrap()
}

pub(super) fn as_string(value: &Value) -> String {
    str_arg(value)
}
