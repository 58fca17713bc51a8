//! Guest values and heap objects.

use std::fmt;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::call_site::CallSiteRef;
use crate::class::{ClassRef, well_known};
use crate::error;
use crate::handle::MethodHandle;
use crate::types::JType;
use crate::util::sync::{read, write};
use crate::var_handle::VarHandle;

/// A value as passed through handle invocation. `Void` is only ever a return value.
#[derive(Clone)]
pub enum Value {
    Void,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<ObjRef>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Ref(a), Value::Ref(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.ptr_eq(b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}b"),
            Value::Char(v) => write!(f, "'\\u{v:04x}'"),
            Value::Short(v) => write!(f, "{v}s"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}d"),
            Value::Ref(None) => write!(f, "null"),
            Value::Ref(Some(obj)) => write!(f, "{obj:?}"),
        }
    }
}

macro_rules! primitive_accessor {
    ($name:ident, $variant:ident, $ty:ty, $label:literal) => {
        pub fn $name(&self) -> Result<$ty> {
            match self {
                Value::$variant(v) => Ok(*v),
                other => Err(error::class_cast(format!("expected {} but found {:?}", $label, other))),
            }
        }
    };
}

impl Value {
    pub const NULL: Value = Value::Ref(None);

    #[inline]
    pub fn object(obj: ObjRef) -> Value {
        Value::Ref(Some(obj))
    }

    pub fn string(s: &str) -> Value {
        Value::object(ObjRef::string(s))
    }

    /// Default value of a field or array element of type `ty`.
    pub fn zero(ty: &JType) -> Value {
        match ty {
            JType::Void => Value::Void,
            JType::Boolean => Value::Boolean(false),
            JType::Byte => Value::Byte(0),
            JType::Char => Value::Char(0),
            JType::Short => Value::Short(0),
            JType::Int => Value::Int(0),
            JType::Long => Value::Long(0),
            JType::Float => Value::Float(0.0),
            JType::Double => Value::Double(0.0),
            JType::Ref(_) => Value::NULL,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Ref(None))
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Ref(Some(obj)) => Some(obj),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<MethodHandle> {
        self.as_object().and_then(|o| o.as_handle().cloned())
    }

    primitive_accessor!(as_bool, Boolean, bool, "boolean");
    primitive_accessor!(as_byte, Byte, i8, "byte");
    primitive_accessor!(as_char, Char, u16, "char");
    primitive_accessor!(as_short, Short, i16, "short");
    primitive_accessor!(as_int, Int, i32, "int");
    primitive_accessor!(as_long, Long, i64, "long");
    primitive_accessor!(as_float, Float, f32, "float");
    primitive_accessor!(as_double, Double, f64, "double");

    /// Primitive type carried by this value, `None` for references and void.
    pub fn primitive_type(&self) -> Option<JType> {
        Some(match self {
            Value::Boolean(_) => JType::Boolean,
            Value::Byte(_) => JType::Byte,
            Value::Char(_) => JType::Char,
            Value::Short(_) => JType::Short,
            Value::Int(_) => JType::Int,
            Value::Long(_) => JType::Long,
            Value::Float(_) => JType::Float,
            Value::Double(_) => JType::Double,
            Value::Void | Value::Ref(_) => return None,
        })
    }

    /// Exact-typing check: the primitive tag must match, references must be null or
    /// an instance of the declared class.
    pub fn matches(&self, ty: &JType) -> bool {
        match (self, ty) {
            (Value::Void, JType::Void) => true,
            (Value::Ref(None), JType::Ref(_)) => true,
            (Value::Ref(Some(obj)), JType::Ref(class)) => class.is_assignable_from(obj.class()),
            (v, t) => v.primitive_type().as_ref() == Some(t),
        }
    }

    pub fn runtime_class(&self) -> Option<ClassRef> {
        self.as_object().map(|o| o.class().clone())
    }

    /// Boxes primitives; references pass through unchanged and void becomes null.
    pub fn boxed(self) -> Value {
        match self {
            Value::Ref(_) => self,
            Value::Void => Value::NULL,
            prim => match ObjRef::boxed(prim) {
                Some(obj) => Value::object(obj),
                None => Value::NULL,
            },
        }
    }

    /// Value equality: primitives by bits, boxed primitives and strings by content,
    /// everything else by identity.
    pub fn same_value(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (self.as_object(), other.as_object()) {
            (Some(a), Some(b)) if a.class() == b.class() => match (a.body(), b.body()) {
                (ObjectBody::Boxed(x), ObjectBody::Boxed(y)) => x == y,
                (ObjectBody::Str(x), ObjectBody::Str(y)) => x == y,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Shared reference to a heap object; equality is identity.
#[derive(Clone)]
pub struct ObjRef(Arc<Object>);

pub struct Object {
    class: ClassRef,
    body: ObjectBody,
}

pub enum ObjectBody {
    Instance(RwLock<Vec<Value>>),
    Array(RwLock<Vec<Value>>),
    Boxed(Value),
    Str(Arc<str>),
    Throwable(Option<Arc<str>>),
    Handle(MethodHandle),
    CallSite(CallSiteRef),
    VarHandle(VarHandle),
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body() {
            ObjectBody::Boxed(v) => write!(f, "{}({:?})", self.class().simple_name(), v),
            ObjectBody::Str(s) => write!(f, "{s:?}"),
            ObjectBody::Handle(h) => write!(f, "MethodHandle{}", h.method_type()),
            _ => write!(f, "{}@{:x}", self.class().simple_name(), self.identity()),
        }
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl ObjRef {
    fn new(class: ClassRef, body: ObjectBody) -> ObjRef {
        ObjRef(Arc::new(Object { class, body }))
    }

    /// Fresh instance with every field at its default value. No constructor runs.
    pub fn new_instance(class: &ClassRef) -> ObjRef {
        let fields = class.instance_field_types().iter().map(Value::zero).collect();
        ObjRef::new(class.clone(), ObjectBody::Instance(RwLock::new(fields)))
    }

    pub fn new_array(array_class: &ClassRef, length: i32) -> Result<ObjRef> {
        let Some(component) = array_class.component_type() else {
            return Err(error::illegal_argument(format!("{array_class} is not an array class")));
        };
        if length < 0 {
            return Err(error::raise(&well_known().negative_array_size, length.to_string()));
        }
        let elements = vec![Value::zero(component); length as usize];
        Ok(ObjRef::new(array_class.clone(), ObjectBody::Array(RwLock::new(elements))))
    }

    /// Array of `component` holding `values`; values are stored as given.
    pub fn array_from(component: &JType, values: Vec<Value>) -> ObjRef {
        ObjRef::new(ClassRef::array_of(component), ObjectBody::Array(RwLock::new(values)))
    }

    pub fn boxed(value: Value) -> Option<ObjRef> {
        let wrapper = value.primitive_type()?.wrapper_class()?;
        Some(ObjRef::new(wrapper, ObjectBody::Boxed(value)))
    }

    pub fn string(s: &str) -> ObjRef {
        ObjRef::new(well_known().string.clone(), ObjectBody::Str(Arc::from(s)))
    }

    pub fn throwable(class: &ClassRef, message: Option<&str>) -> ObjRef {
        ObjRef::new(class.clone(), ObjectBody::Throwable(message.map(Arc::from)))
    }

    pub fn handle(handle: MethodHandle) -> ObjRef {
        ObjRef::new(well_known().method_handle.clone(), ObjectBody::Handle(handle))
    }

    pub fn call_site(site: CallSiteRef) -> ObjRef {
        ObjRef::new(well_known().call_site.clone(), ObjectBody::CallSite(site))
    }

    pub fn var_handle(handle: VarHandle) -> ObjRef {
        ObjRef::new(well_known().var_handle.clone(), ObjectBody::VarHandle(handle))
    }

    #[inline]
    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    #[inline]
    pub fn body(&self) -> &ObjectBody {
        &self.0.body
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn array_length(&self) -> Option<usize> {
        match self.body() {
            ObjectBody::Array(elements) => Some(read(elements).len()),
            _ => None,
        }
    }

    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match self.body() {
            ObjectBody::Array(elements) => Some(read(elements).clone()),
            _ => None,
        }
    }

    pub fn array_get(&self, index: i32) -> Result<Value> {
        let ObjectBody::Array(elements) = self.body() else {
            return Err(error::illegal_argument(format!("{} is not an array", self.class())));
        };
        let elements = read(elements);
        usize::try_from(index)
            .ok()
            .and_then(|i| elements.get(i).cloned())
            .ok_or_else(|| array_index_error(index, elements.len()))
    }

    /// Stores with the array-store check for reference components.
    pub fn array_set(&self, index: i32, value: Value) -> Result<()> {
        let ObjectBody::Array(elements) = self.body() else {
            return Err(error::illegal_argument(format!("{} is not an array", self.class())));
        };
        if let Some(component) = self.class().component_type()
            && !value.matches(component)
        {
            return Err(error::raise(
                &well_known().array_store,
                format!("{:?} cannot be stored in {}", value, self.class()),
            ));
        }
        let mut elements = write(elements);
        let len = elements.len();
        match usize::try_from(index).ok().and_then(|i| elements.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(array_index_error(index, len)),
        }
    }

    pub fn field(&self, offset: usize) -> Option<Value> {
        match self.body() {
            ObjectBody::Instance(fields) => read(fields).get(offset).cloned(),
            _ => None,
        }
    }

    pub fn set_field(&self, offset: usize, value: Value) -> bool {
        match self.body() {
            ObjectBody::Instance(fields) => match write(fields).get_mut(offset) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub fn unbox(&self) -> Option<Value> {
        match self.body() {
            ObjectBody::Boxed(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.body() {
            ObjectBody::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&MethodHandle> {
        match self.body() {
            ObjectBody::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_call_site(&self) -> Option<&CallSiteRef> {
        match self.body() {
            ObjectBody::CallSite(site) => Some(site),
            _ => None,
        }
    }

    pub fn as_var_handle(&self) -> Option<&VarHandle> {
        match self.body() {
            ObjectBody::VarHandle(vh) => Some(vh),
            _ => None,
        }
    }

    pub fn throwable_message(&self) -> Option<&str> {
        match self.body() {
            ObjectBody::Throwable(msg) => msg.as_deref(),
            _ => None,
        }
    }
}

fn array_index_error(index: i32, len: usize) -> anyhow::Error {
    error::raise(
        &well_known().array_index_out_of_bounds,
        format!("Index {index} out of bounds for length {len}"),
    )
}
