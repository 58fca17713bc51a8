//! The internal class whose static methods back identity, throw, array access and
//! loop-counter handles. Bodies are type-generic; callers retype the direct handle
//! with [`MethodHandle::clone_with_new_type`].

use anyhow::Result;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::class::flags::{ACC_FINAL, ACC_PUBLIC, ACC_STATIC};
use crate::class::{ClassBuilder, ClassRef, well_known};
use crate::engine::{MemberDescriptor, RefKind, default_engine};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

use super::{MethodHandle, require_object};

const SUPPORT_CLASS: &str = "java/lang/invoke/MethodHandleSupport";

fn arg(args: &[Value], index: usize) -> Result<&Value> {
    args.get(index)
        .ok_or_else(|| error::illegal_state(format!("support method expected argument {index}")))
}

fn array_arg<'a>(args: &'a [Value]) -> Result<&'a ObjRef> {
    require_object(arg(args, 0)?, "array")
}

static SUPPORT: Lazy<ClassRef> = Lazy::new(|| {
    let object = JType::object;
    let throwable = JType::of(&well_known().throwable);
    ClassBuilder::new(SUPPORT_CLASS)
        .flags(ACC_PUBLIC | ACC_FINAL)
        .method(
            "identity",
            MethodType::method_type(object(), vec![object()]),
            ACC_STATIC,
            |args| arg(args, 0).cloned(),
        )
        .method("nop", MethodType::method_type(JType::Void, vec![]), ACC_STATIC, |_| Ok(Value::Void))
        .method(
            "throwException",
            MethodType::method_type(object(), vec![throwable]),
            ACC_STATIC,
            |args| {
                let thrown = require_object(arg(args, 0)?, "exception")?;
                Err(error::rethrow(thrown.clone()))
            },
        )
        .method(
            "arrayGet",
            MethodType::method_type(object(), vec![object(), JType::Int]),
            ACC_STATIC,
            |args| array_arg(args)?.array_get(arg(args, 1)?.as_int()?),
        )
        .method(
            "arraySet",
            MethodType::method_type(JType::Void, vec![object(), JType::Int, object()]),
            ACC_STATIC,
            |args| {
                array_arg(args)?.array_set(arg(args, 1)?.as_int()?, arg(args, 2)?.clone())?;
                Ok(Value::Void)
            },
        )
        .method(
            "arrayLength",
            MethodType::method_type(JType::Int, vec![object()]),
            ACC_STATIC,
            |args| {
                let array = array_arg(args)?;
                let len = array
                    .array_length()
                    .ok_or_else(|| error::illegal_argument(format!("{} is not an array", array.class())))?;
                Ok(Value::Int(len as i32))
            },
        )
        .method(
            "counterIncrement",
            MethodType::method_type(JType::Int, vec![JType::Int, JType::Int]),
            ACC_STATIC,
            |args| Ok(Value::Int(arg(args, 1)?.as_int()?.wrapping_add(1))),
        )
        .method(
            "counterPredicate",
            MethodType::method_type(JType::Boolean, vec![JType::Int, JType::Int]),
            ACC_STATIC,
            |args| Ok(Value::Boolean(arg(args, 1)?.as_int()? < arg(args, 0)?.as_int()?)),
        )
        .build()
});

static HANDLES: Lazy<DashMap<&'static str, MethodHandle>> = Lazy::new(DashMap::new);

static ARRAY_CONSTRUCTORS: Lazy<DashMap<ClassRef, MethodHandle>> = Lazy::new(DashMap::new);

fn static_handle(class: &ClassRef, name: &str, ty: MethodType) -> Result<MethodHandle> {
    MethodHandle::primitive(
        default_engine(),
        RefKind::InvokeStatic,
        class,
        name,
        MemberDescriptor::Method(ty),
        None,
    )
}

fn support_handle(name: &'static str) -> Result<MethodHandle> {
    if let Some(hit) = HANDLES.get(name) {
        return Ok(hit.clone());
    }
    let ty = SUPPORT
        .declared_methods()
        .into_iter()
        .find(|m| m.name() == name)
        .map(|m| m.method_type().clone())
        .ok_or_else(|| error::no_such_method(format!("{SUPPORT_CLASS}.{name}")))?;
    let handle = static_handle(&SUPPORT, name, ty)?;
    Ok(HANDLES.entry(name).or_insert(handle).clone())
}

pub(crate) fn identity() -> Result<MethodHandle> {
    support_handle("identity")
}

pub(crate) fn nop() -> Result<MethodHandle> {
    support_handle("nop")
}

pub(crate) fn throw_exception() -> Result<MethodHandle> {
    support_handle("throwException")
}

pub(crate) fn array_get() -> Result<MethodHandle> {
    support_handle("arrayGet")
}

pub(crate) fn array_set() -> Result<MethodHandle> {
    support_handle("arraySet")
}

pub(crate) fn array_length() -> Result<MethodHandle> {
    support_handle("arrayLength")
}

pub(crate) fn counter_increment() -> Result<MethodHandle> {
    support_handle("counterIncrement")
}

pub(crate) fn counter_predicate() -> Result<MethodHandle> {
    support_handle("counterPredicate")
}

/// `(int)T[]` for `array_class`, backed by a helper class per array type.
pub(crate) fn new_array(array_class: &ClassRef) -> Result<MethodHandle> {
    if let Some(hit) = ARRAY_CONSTRUCTORS.get(array_class) {
        return Ok(hit.clone());
    }
    let ty = MethodType::method_type(JType::of(array_class), vec![JType::Int]);
    let target = array_class.clone();
    let helper = ClassBuilder::new(&format!("{SUPPORT_CLASS}$ArrayOf{}", array_class.descriptor()))
        .flags(ACC_FINAL)
        .method("newArray", ty.clone(), ACC_STATIC, move |args| {
            Ok(Value::object(ObjRef::new_array(&target, arg(args, 0)?.as_int()?)?))
        })
        .build();
    let handle = static_handle(&helper, "newArray", ty)?;
    Ok(ARRAY_CONSTRUCTORS.entry(array_class.clone()).or_insert(handle).clone())
}
