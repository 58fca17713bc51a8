//! The execution engine: everything host-VM specific the handle core needs.
//!
//! Member resolution, class initialization, call-by-address, dispatch-table
//! lookups and raw field access all go through [`ExecutionEngine`]. [`HeapEngine`]
//! backs them with the in-process class model.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

use anyhow::Result;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::class::{CONSTRUCTOR_NAME, ClassRef, MethodRef};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

/// Resolved location of a member. Its meaning depends on the handle kind: a code
/// address for static/special/constructor calls, a dispatch-table index for
/// virtual/interface calls, a storage offset for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmSlot(pub usize);

/// JVM reference kinds (`REF_getField` = 1 .. `REF_invokeInterface` = 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RefKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl RefKind {
    #[inline]
    pub fn is_field(self) -> bool {
        (self as u8) <= 4
    }

    #[inline]
    pub fn is_static(self) -> bool {
        matches!(self, RefKind::GetStatic | RefKind::PutStatic | RefKind::InvokeStatic)
    }

    #[inline]
    pub fn is_setter(self) -> bool {
        matches!(self, RefKind::PutField | RefKind::PutStatic)
    }

    pub fn from_code(code: u8) -> Option<RefKind> {
        Some(match code {
            1 => RefKind::GetField,
            2 => RefKind::GetStatic,
            3 => RefKind::PutField,
            4 => RefKind::PutStatic,
            5 => RefKind::InvokeVirtual,
            6 => RefKind::InvokeStatic,
            7 => RefKind::InvokeSpecial,
            8 => RefKind::NewInvokeSpecial,
            9 => RefKind::InvokeInterface,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberDescriptor {
    Method(MethodType),
    Field(JType),
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberDescriptor::Method(ty) => write!(f, "{ty}"),
            MemberDescriptor::Field(ty) => write!(f, "{ty}"),
        }
    }
}

pub struct MemberRequest<'a> {
    pub class: &'a ClassRef,
    pub name: &'a str,
    pub descriptor: MemberDescriptor,
    pub kind: RefKind,
}

#[derive(Debug, Clone)]
pub struct ResolvedMember {
    pub defining_class: ClassRef,
    pub name: Arc<str>,
    pub descriptor: MemberDescriptor,
    pub modifiers: u32,
    pub slot: VmSlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NotFound(String),
    Linkage(String),
    IncompatibleChange(String),
}

impl ResolveError {
    /// Maps onto the handle-level taxonomy: absent members are "no such member",
    /// everything else is an access failure.
    pub fn into_error(self, kind: RefKind) -> anyhow::Error {
        match self {
            ResolveError::NotFound(msg) if kind.is_field() => error::no_such_field(msg),
            ResolveError::NotFound(msg) => error::no_such_method(msg),
            ResolveError::Linkage(msg) | ResolveError::IncompatibleChange(msg) => error::illegal_access(msg),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound(m) => write!(f, "not found: {m}"),
            ResolveError::Linkage(m) => write!(f, "linkage error: {m}"),
            ResolveError::IncompatibleChange(m) => write!(f, "incompatible class change: {m}"),
        }
    }
}

pub trait ExecutionEngine: Send + Sync {
    fn resolve(&self, request: &MemberRequest<'_>) -> std::result::Result<ResolvedMember, ResolveError>;

    /// Re-resolves the slot of an already resolved member after its class was
    /// redefined. `None` when the member is gone.
    fn refresh(&self, member: &ResolvedMember, kind: RefKind) -> Option<VmSlot>;

    fn initialize(&self, class: &ClassRef) -> Result<()>;

    fn call(&self, address: VmSlot, args: &[Value]) -> Result<Value>;

    fn virtual_target(&self, receiver_class: &ClassRef, vtable_index: usize) -> Result<VmSlot>;

    fn interface_target(&self, receiver_class: &ClassRef, interface: &ClassRef, itable_index: usize) -> Result<VmSlot>;

    fn get_field(&self, object: &ObjRef, offset: usize, volatile: bool) -> Result<Value>;

    fn put_field(&self, object: &ObjRef, offset: usize, value: Value, volatile: bool) -> Result<()>;

    fn get_static(&self, class: &ClassRef, offset: usize, volatile: bool) -> Result<Value>;

    fn put_static(&self, class: &ClassRef, offset: usize, value: Value, volatile: bool) -> Result<()>;

    fn allocate(&self, class: &ClassRef) -> Result<ObjRef>;
}

/// Reference engine over the in-process class model. Code addresses are method ids.
#[derive(Default)]
pub struct HeapEngine {
    code: DashMap<usize, MethodRef>,
}

static DEFAULT_ENGINE: Lazy<Arc<HeapEngine>> = Lazy::new(|| Arc::new(HeapEngine::new()));

/// The process-wide engine used when no other is supplied.
pub fn default_engine() -> Arc<dyn ExecutionEngine> {
    DEFAULT_ENGINE.clone()
}

impl HeapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, method: &MethodRef) -> VmSlot {
        self.code.entry(method.id()).or_insert_with(|| method.clone());
        VmSlot(method.id())
    }

    fn resolved(&self, method: &MethodRef, defining: ClassRef, slot: VmSlot) -> ResolvedMember {
        ResolvedMember {
            defining_class: defining,
            name: Arc::from(method.name()),
            descriptor: MemberDescriptor::Method(method.method_type().clone()),
            modifiers: method.flags(),
            slot,
        }
    }

    fn resolve_method(
        &self,
        class: &ClassRef,
        name: &str,
        ty: &MethodType,
        kind: RefKind,
    ) -> std::result::Result<ResolvedMember, ResolveError> {
        let describe = || format!("{}.{}{}", class, name, ty.descriptor());
        if kind == RefKind::NewInvokeSpecial {
            if name != CONSTRUCTOR_NAME {
                return Err(ResolveError::Linkage(format!("{} is not a constructor", describe())));
            }
            let ctor = class
                .declared_method(CONSTRUCTOR_NAME, ty)
                .ok_or_else(|| ResolveError::NotFound(describe()))?;
            let slot = self.register(&ctor);
            return Ok(self.resolved(&ctor, class.clone(), slot));
        }

        let method = class.find_method(name, ty).ok_or_else(|| ResolveError::NotFound(describe()))?;
        let defining = method
            .declaring_class()
            .ok_or_else(|| ResolveError::Linkage(format!("{} has been unloaded", describe())))?;
        if kind.is_static() != method.is_static() {
            return Err(ResolveError::IncompatibleChange(format!(
                "{} expected {}",
                describe(),
                if kind.is_static() { "static" } else { "non-static" }
            )));
        }
        match kind {
            RefKind::InvokeStatic | RefKind::InvokeSpecial => {
                let slot = self.register(&method);
                Ok(self.resolved(&method, defining, slot))
            }
            RefKind::InvokeVirtual => {
                if class.is_interface() {
                    return Err(ResolveError::IncompatibleChange(format!("{} is an interface", class)));
                }
                let index = method.vtable_index().ok_or_else(|| {
                    ResolveError::IncompatibleChange(format!("{} is not virtually dispatched", describe()))
                })?;
                Ok(self.resolved(&method, defining, VmSlot(index)))
            }
            RefKind::InvokeInterface => {
                if !defining.is_interface() {
                    return Err(ResolveError::IncompatibleChange(format!("{} is not an interface method", describe())));
                }
                let index = defining
                    .interface_method_index(name, ty)
                    .ok_or_else(|| ResolveError::NotFound(describe()))?;
                Ok(self.resolved(&method, defining, VmSlot(index)))
            }
            _ => Err(ResolveError::Linkage(format!("{kind:?} is not a method reference kind"))),
        }
    }

    fn resolve_field(
        &self,
        class: &ClassRef,
        name: &str,
        ty: &JType,
        kind: RefKind,
    ) -> std::result::Result<ResolvedMember, ResolveError> {
        let describe = || format!("{}.{}:{}", class, name, ty);
        let field = class
            .find_field(name)
            .filter(|f| f.field_type() == ty)
            .ok_or_else(|| ResolveError::NotFound(describe()))?;
        if field.is_static() != kind.is_static() {
            return Err(ResolveError::IncompatibleChange(format!(
                "{} expected {}",
                describe(),
                if kind.is_static() { "static" } else { "non-static" }
            )));
        }
        let defining = field
            .declaring_class()
            .ok_or_else(|| ResolveError::Linkage(format!("{} has been unloaded", describe())))?;
        Ok(ResolvedMember {
            defining_class: defining,
            name: Arc::from(field.name()),
            descriptor: MemberDescriptor::Field(ty.clone()),
            modifiers: field.flags(),
            slot: VmSlot(field.offset()),
        })
    }
}

impl ExecutionEngine for HeapEngine {
    fn resolve(&self, request: &MemberRequest<'_>) -> std::result::Result<ResolvedMember, ResolveError> {
        match (&request.descriptor, request.kind.is_field()) {
            (MemberDescriptor::Method(ty), false) => self.resolve_method(request.class, request.name, ty, request.kind),
            (MemberDescriptor::Field(ty), true) => self.resolve_field(request.class, request.name, ty, request.kind),
            _ => Err(ResolveError::Linkage(format!(
                "descriptor {} does not fit {:?}",
                request.descriptor, request.kind
            ))),
        }
    }

    fn refresh(&self, member: &ResolvedMember, kind: RefKind) -> Option<VmSlot> {
        match (kind, &member.descriptor) {
            (RefKind::InvokeStatic | RefKind::InvokeSpecial | RefKind::NewInvokeSpecial, MemberDescriptor::Method(ty)) => {
                let method = member.defining_class.declared_method(&member.name, ty)?;
                let slot = self.register(&method);
                Some(slot)
            }
            _ => Some(member.slot),
        }
    }

    fn initialize(&self, class: &ClassRef) -> Result<()> {
        class.ensure_initialized()
    }

    fn call(&self, address: VmSlot, args: &[Value]) -> Result<Value> {
        // clone out of the map so the shard lock is not held across guest code
        let method = self
            .code
            .get(&address.0)
            .map(|m| m.value().clone())
            .ok_or_else(|| error::incompatible_class_change(format!("no code at address {}", address.0)))?;
        method.invoke(args)
    }

    fn virtual_target(&self, receiver_class: &ClassRef, vtable_index: usize) -> Result<VmSlot> {
        let method = receiver_class.vtable_entry(vtable_index).ok_or_else(|| {
            error::incompatible_class_change(format!("{} has no vtable entry {}", receiver_class, vtable_index))
        })?;
        Ok(self.register(&method))
    }

    fn interface_target(&self, receiver_class: &ClassRef, interface: &ClassRef, itable_index: usize) -> Result<VmSlot> {
        if !interface.is_assignable_from(receiver_class) {
            return Err(error::incompatible_class_change(format!(
                "{} does not implement {}",
                receiver_class, interface
            )));
        }
        let declared = interface.interface_method(itable_index).ok_or_else(|| {
            error::incompatible_class_change(format!("{} has no interface method {}", interface, itable_index))
        })?;
        let method = receiver_class
            .find_virtual_implementation(declared.name(), declared.method_type())
            .unwrap_or(declared);
        Ok(self.register(&method))
    }

    fn get_field(&self, object: &ObjRef, offset: usize, volatile: bool) -> Result<Value> {
        if volatile {
            fence(Ordering::SeqCst);
        }
        object
            .field(offset)
            .ok_or_else(|| error::incompatible_class_change(format!("{:?} has no field slot {}", object, offset)))
    }

    fn put_field(&self, object: &ObjRef, offset: usize, value: Value, volatile: bool) -> Result<()> {
        if !object.set_field(offset, value) {
            return Err(error::incompatible_class_change(format!(
                "{:?} has no field slot {}",
                object, offset
            )));
        }
        if volatile {
            fence(Ordering::SeqCst);
        }
        Ok(())
    }

    fn get_static(&self, class: &ClassRef, offset: usize, volatile: bool) -> Result<Value> {
        if volatile {
            fence(Ordering::SeqCst);
        }
        class
            .static_value(offset)
            .ok_or_else(|| error::incompatible_class_change(format!("{} has no static slot {}", class, offset)))
    }

    fn put_static(&self, class: &ClassRef, offset: usize, value: Value, volatile: bool) -> Result<()> {
        if !class.set_static_value(offset, value) {
            return Err(error::incompatible_class_change(format!(
                "{} has no static slot {}",
                class, offset
            )));
        }
        if volatile {
            fence(Ordering::SeqCst);
        }
        Ok(())
    }

    fn allocate(&self, class: &ClassRef) -> Result<ObjRef> {
        if class.is_interface() || class.is_abstract() || class.is_array() {
            return Err(error::illegal_argument(format!("cannot instantiate {class}")));
        }
        Ok(ObjRef::new_instance(class))
    }
}
