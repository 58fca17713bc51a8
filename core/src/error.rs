//! Failure taxonomy.
//!
//! Every failure the handle core raises is a guest throwable object carried inside an
//! `anyhow::Error`. Guest method bodies raise their own exceptions the same way, which
//! is what lets catch/finally combinators intercept them.

use std::fmt;

use crate::class::{ClassRef, well_known};
use crate::value::{ObjRef, Value};

/// Coarse classification of a throwable by its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoSuchMember,
    IllegalAccess,
    WrongMethodType,
    IllegalArgument,
    NullReference,
    IllegalState,
    UnsupportedOperation,
    ClassCast,
    IncompatibleClassChange,
    ArrayIndex,
    ArrayStore,
    /// Any other guest exception.
    Guest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NoSuchMember => "no such member",
            ErrorKind::IllegalAccess => "illegal access",
            ErrorKind::WrongMethodType => "wrong method type",
            ErrorKind::IllegalArgument => "illegal argument",
            ErrorKind::NullReference => "null reference",
            ErrorKind::IllegalState => "illegal state",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::ClassCast => "class cast",
            ErrorKind::IncompatibleClassChange => "incompatible class change",
            ErrorKind::ArrayIndex => "array index out of bounds",
            ErrorKind::ArrayStore => "array store",
            ErrorKind::Guest => "guest exception",
        };
        f.write_str(s)
    }
}

/// A guest exception object travelling as a Rust error.
#[derive(Clone)]
pub struct Throwable {
    object: ObjRef,
}

impl Throwable {
    pub fn new(class: &ClassRef, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = (!message.is_empty()).then_some(message.as_str());
        Self {
            object: ObjRef::throwable(class, message),
        }
    }

    /// Wraps an existing guest object; `None` when it is not a throwable.
    pub fn from_object(object: ObjRef) -> Option<Self> {
        well_known()
            .throwable
            .is_assignable_from(object.class())
            .then_some(Self { object })
    }

    #[inline]
    pub fn object(&self) -> &ObjRef {
        &self.object
    }

    #[inline]
    pub fn class(&self) -> &ClassRef {
        self.object.class()
    }

    pub fn message(&self) -> Option<&str> {
        self.object.throwable_message()
    }

    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        class.is_assignable_from(self.class())
    }

    pub fn to_value(&self) -> Value {
        Value::object(self.object.clone())
    }

    pub fn kind(&self) -> ErrorKind {
        let wk = well_known();
        let table = [
            (&wk.no_such_method, ErrorKind::NoSuchMember),
            (&wk.no_such_field, ErrorKind::NoSuchMember),
            (&wk.illegal_access, ErrorKind::IllegalAccess),
            (&wk.wrong_method_type, ErrorKind::WrongMethodType),
            (&wk.null_pointer, ErrorKind::NullReference),
            (&wk.illegal_state, ErrorKind::IllegalState),
            (&wk.unsupported_operation, ErrorKind::UnsupportedOperation),
            (&wk.class_cast, ErrorKind::ClassCast),
            (&wk.incompatible_class_change, ErrorKind::IncompatibleClassChange),
            (&wk.array_index_out_of_bounds, ErrorKind::ArrayIndex),
            (&wk.array_store, ErrorKind::ArrayStore),
            (&wk.illegal_argument, ErrorKind::IllegalArgument),
        ];
        table
            .into_iter()
            .find(|(class, _)| self.is_instance_of(class))
            .map(|(_, kind)| kind)
            .unwrap_or(ErrorKind::Guest)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}: {}", self.class(), msg),
            None => write!(f, "{}", self.class()),
        }
    }
}

impl fmt::Debug for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Throwable({self})")
    }
}

impl std::error::Error for Throwable {}

/// The guest throwable carried by `err`, if any.
pub fn throwable_of(err: &anyhow::Error) -> Option<&Throwable> {
    err.downcast_ref::<Throwable>()
}

pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    throwable_of(err).map(Throwable::kind)
}

/// Raises a new instance of `class`.
pub fn raise(class: &ClassRef, message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Throwable::new(class, message))
}

/// Rethrows an existing guest throwable object.
pub fn rethrow(object: ObjRef) -> anyhow::Error {
    match Throwable::from_object(object) {
        Some(t) => anyhow::Error::new(t),
        None => class_cast("thrown value is not a Throwable"),
    }
}

pub fn no_such_method(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().no_such_method, msg)
}

pub fn no_such_field(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().no_such_field, msg)
}

pub fn illegal_access(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().illegal_access, msg)
}

pub fn wrong_method_type(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().wrong_method_type, msg)
}

pub fn illegal_argument(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().illegal_argument, msg)
}

pub fn null_reference(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().null_pointer, msg)
}

pub fn illegal_state(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().illegal_state, msg)
}

pub fn unsupported(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().unsupported_operation, msg)
}

pub fn class_cast(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().class_cast, msg)
}

pub fn incompatible_class_change(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().incompatible_class_change, msg)
}

pub fn abstract_method(msg: impl Into<String>) -> anyhow::Error {
    raise(&well_known().abstract_method, msg)
}
