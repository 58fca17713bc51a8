//! Field and array-element var handles with the plain and ordered access modes.
//!
//! Every mode goes through the field's getter or setter direct handle; ordering
//! modes add fences around the raw access.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

use anyhow::Result;
use serde::Serialize;

use crate::class::ClassRef;
use crate::convert::{convert_return, convert_value};
use crate::error;
use crate::handle::MethodHandle;
use crate::handle::constant::{array_element_getter, array_element_setter};
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccessMode {
    Get,
    Set,
    GetVolatile,
    SetVolatile,
    GetOpaque,
    SetOpaque,
    GetAcquire,
    SetRelease,
}

impl AccessMode {
    pub const ALL: [AccessMode; 8] = [
        AccessMode::Get,
        AccessMode::Set,
        AccessMode::GetVolatile,
        AccessMode::SetVolatile,
        AccessMode::GetOpaque,
        AccessMode::SetOpaque,
        AccessMode::GetAcquire,
        AccessMode::SetRelease,
    ];

    pub fn is_read(self) -> bool {
        matches!(
            self,
            AccessMode::Get | AccessMode::GetVolatile | AccessMode::GetOpaque | AccessMode::GetAcquire
        )
    }

    pub fn method_name(self) -> &'static str {
        match self {
            AccessMode::Get => "get",
            AccessMode::Set => "set",
            AccessMode::GetVolatile => "getVolatile",
            AccessMode::SetVolatile => "setVolatile",
            AccessMode::GetOpaque => "getOpaque",
            AccessMode::SetOpaque => "setOpaque",
            AccessMode::GetAcquire => "getAcquire",
            AccessMode::SetRelease => "setRelease",
        }
    }

    pub fn from_method_name(name: &str) -> Option<AccessMode> {
        Self::ALL.into_iter().find(|m| m.method_name() == name)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

struct VarHandleData {
    var_type: JType,
    coordinates: Vec<JType>,
    getter: MethodHandle,
    setter: Option<MethodHandle>,
}

/// A typed reference to a variable; instance fields take the receiver as their
/// single coordinate, static fields take none.
#[derive(Clone)]
pub struct VarHandle(Arc<VarHandleData>);

impl VarHandle {
    /// `getter` is `(coordinates)T`; `setter` is `(coordinates, T)void` or absent for
    /// final fields.
    pub(crate) fn field(getter: MethodHandle, setter: Option<MethodHandle>) -> VarHandle {
        let ty = getter.method_type();
        VarHandle(Arc::new(VarHandleData {
            var_type: ty.return_type().clone(),
            coordinates: ty.parameters().to_vec(),
            getter,
            setter,
        }))
    }

    pub fn var_type(&self) -> &JType {
        &self.0.var_type
    }

    pub fn coordinate_types(&self) -> &[JType] {
        &self.0.coordinates
    }

    pub fn is_access_mode_supported(&self, mode: AccessMode) -> bool {
        mode.is_read() || self.0.setter.is_some()
    }

    pub fn access_mode_type(&self, mode: AccessMode) -> MethodType {
        let mut params = self.0.coordinates.clone();
        if mode.is_read() {
            MethodType::method_type(self.0.var_type.clone(), params)
        } else {
            params.push(self.0.var_type.clone());
            MethodType::method_type(JType::Void, params)
        }
    }

    /// The direct handle backing `mode`, without ordering fences.
    pub fn to_method_handle(&self, mode: AccessMode) -> Result<MethodHandle> {
        if mode.is_read() {
            return Ok(self.0.getter.clone());
        }
        self.0
            .setter
            .clone()
            .ok_or_else(|| error::unsupported(format!("{mode} on a final field")))
    }

    fn access(&self, mode: AccessMode, args: Vec<Value>) -> Result<Value> {
        let handle = self.to_method_handle(mode)?;
        match mode {
            AccessMode::Get | AccessMode::Set | AccessMode::GetOpaque | AccessMode::SetOpaque => handle.invoke_basic(args),
            AccessMode::GetVolatile | AccessMode::SetVolatile => {
                fence(Ordering::SeqCst);
                let result = handle.invoke_basic(args);
                fence(Ordering::SeqCst);
                result
            }
            AccessMode::GetAcquire => {
                let result = handle.invoke_basic(args);
                fence(Ordering::Acquire);
                result
            }
            AccessMode::SetRelease => {
                fence(Ordering::Release);
                handle.invoke_basic(args)
            }
        }
    }

    /// Exact access: `call_type` must equal the mode's access type.
    pub fn invoke_exact(&self, mode: AccessMode, call_type: &MethodType, args: Vec<Value>) -> Result<Value> {
        let expected = self.access_mode_type(mode);
        if *call_type != expected {
            return Err(error::wrong_method_type(format!(
                "{mode} expects {expected} but was invoked with {call_type}"
            )));
        }
        self.access(mode, args)
    }

    /// Access with per-argument conversion from `call_type` to the mode's type.
    pub fn invoke(&self, mode: AccessMode, call_type: &MethodType, args: Vec<Value>) -> Result<Value> {
        let expected = self.access_mode_type(mode);
        if *call_type == expected {
            return self.access(mode, args);
        }
        if call_type.parameter_count() != expected.parameter_count() {
            return Err(error::wrong_method_type(format!(
                "{mode} expects {expected} but was invoked with {call_type}"
            )));
        }
        let mut converted = Vec::with_capacity(args.len());
        for ((arg, from), to) in args.into_iter().zip(call_type.parameters()).zip(expected.parameters()) {
            converted.push(convert_value(arg, from, to, false)?);
        }
        let result = self.access(mode, converted)?;
        convert_return(result, expected.return_type(), call_type.return_type(), false)
    }

    pub fn get(&self, coordinates: Vec<Value>) -> Result<Value> {
        self.access(AccessMode::Get, coordinates)
    }

    pub fn set(&self, mut coordinates: Vec<Value>, value: Value) -> Result<()> {
        coordinates.push(value);
        self.access(AccessMode::Set, coordinates).map(|_| ())
    }

    pub fn ptr_eq(&self, other: &VarHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn to_value(&self) -> Value {
        Value::object(ObjRef::var_handle(self.clone()))
    }
}

/// A var handle over the elements of `array_class`, with coordinates `(T[], int)`.
pub fn array_element_var_handle(array_class: &ClassRef) -> Result<VarHandle> {
    let getter = array_element_getter(array_class)?;
    let setter = array_element_setter(array_class)?;
    Ok(VarHandle::field(getter, Some(setter)))
}

impl fmt::Debug for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarHandle[{}", self.0.var_type)?;
        for c in &self.0.coordinates {
            write!(f, ", {c}")?;
        }
        write!(f, "]")
    }
}
