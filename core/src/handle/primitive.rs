//! Direct handles: methods, constructors and fields bound to a resolved VM member.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::class::ClassRef;
use crate::class::flags::{ACC_STATIC, ACC_VOLATILE};
use crate::engine::{ExecutionEngine, MemberDescriptor, MemberRequest, RefKind, ResolvedMember, VmSlot};
use crate::error;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::{ObjRef, Value};

use super::{HandleKind, MethodHandle, Payload, require_object};

pub(crate) struct PrimitiveTarget {
    engine: Arc<dyn ExecutionEngine>,
    ref_kind: RefKind,
    reference_class: ClassRef,
    member: ResolvedMember,
    special_caller: Option<ClassRef>,
    slot: AtomicUsize,
}

/// What `reveal_direct` hands back for a direct handle.
#[derive(Debug, Clone, Serialize)]
pub struct MemberInfo {
    pub kind: HandleKind,
    pub ref_kind: u8,
    pub declaring_class: String,
    pub name: String,
    pub method_type: String,
    pub modifiers: u32,
}

impl PrimitiveTarget {
    #[inline]
    pub(crate) fn ref_kind(&self) -> RefKind {
        self.ref_kind
    }

    #[inline]
    pub(crate) fn reference_class(&self) -> &ClassRef {
        &self.reference_class
    }

    #[inline]
    pub(crate) fn defining_class(&self) -> &ClassRef {
        &self.member.defining_class
    }

    #[inline]
    pub(crate) fn name(&self) -> &str {
        &self.member.name
    }

    #[inline]
    pub(crate) fn descriptor(&self) -> &MemberDescriptor {
        &self.member.descriptor
    }

    #[inline]
    pub(crate) fn modifiers(&self) -> u32 {
        self.member.modifiers
    }

    #[inline]
    pub(crate) fn special_caller(&self) -> Option<&ClassRef> {
        self.special_caller.as_ref()
    }

    #[inline]
    pub(crate) fn slot(&self) -> VmSlot {
        VmSlot(self.slot.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn engine(&self) -> &Arc<dyn ExecutionEngine> {
        &self.engine
    }

    fn is_volatile(&self) -> bool {
        self.member.modifiers & ACC_VOLATILE != 0
    }

    /// Re-reads the slot from the engine. Identity and type of the owning handle do
    /// not change.
    pub(crate) fn refresh(&self) {
        if let Some(slot) = self.engine.refresh(&self.member, self.ref_kind) {
            let old = self.slot.swap(slot.0, Ordering::AcqRel);
            if old != slot.0 {
                debug!(
                    target: "invoke::redefine",
                    class = %self.member.defining_class,
                    member = %self.member.name,
                    old,
                    new = slot.0,
                    "refreshed vmSlot"
                );
            }
        }
    }

    pub(crate) fn info(&self, kind: HandleKind) -> MemberInfo {
        MemberInfo {
            kind,
            ref_kind: self.ref_kind as u8,
            declaring_class: self.member.defining_class.to_string(),
            name: self.member.name.to_string(),
            method_type: self.member.descriptor.to_string(),
            modifiers: self.member.modifiers,
        }
    }
}

fn handle_kind(ref_kind: RefKind) -> HandleKind {
    match ref_kind {
        RefKind::GetField => HandleKind::GetField,
        RefKind::GetStatic => HandleKind::GetStaticField,
        RefKind::PutField => HandleKind::PutField,
        RefKind::PutStatic => HandleKind::PutStaticField,
        RefKind::InvokeVirtual => HandleKind::Virtual,
        RefKind::InvokeStatic => HandleKind::Static,
        RefKind::InvokeSpecial => HandleKind::Special,
        RefKind::NewInvokeSpecial => HandleKind::Constructor,
        RefKind::InvokeInterface => HandleKind::Interface,
    }
}

/// The handle type for a member: receivers become a leading parameter, constructors
/// return the new instance, getters return the field and setters take it.
fn handle_type(ref_kind: RefKind, receiver: &ClassRef, descriptor: &MemberDescriptor) -> MethodType {
    let recv = JType::of(receiver);
    match (ref_kind, descriptor) {
        (RefKind::InvokeStatic, MemberDescriptor::Method(ty)) => ty.clone(),
        (RefKind::NewInvokeSpecial, MemberDescriptor::Method(ty)) => ty.change_return_type(recv),
        (_, MemberDescriptor::Method(ty)) => {
            let mut params = Vec::with_capacity(ty.parameter_count() + 1);
            params.push(recv);
            params.extend(ty.parameters().iter().cloned());
            MethodType::method_type(ty.return_type().clone(), params)
        }
        (RefKind::GetField, MemberDescriptor::Field(ty)) => MethodType::method_type(ty.clone(), vec![recv]),
        (RefKind::PutField, MemberDescriptor::Field(ty)) => {
            MethodType::method_type(JType::Void, vec![recv, ty.clone()])
        }
        (RefKind::GetStatic, MemberDescriptor::Field(ty)) => MethodType::method_type(ty.clone(), vec![]),
        (_, MemberDescriptor::Field(ty)) => MethodType::method_type(JType::Void, vec![ty.clone()]),
    }
}

impl MethodHandle {
    /// Resolves `name`/`descriptor` in `reference_class` and builds the direct handle.
    /// The handle registers with its defining class so redefinition can refresh it.
    pub(crate) fn primitive(
        engine: Arc<dyn ExecutionEngine>,
        ref_kind: RefKind,
        reference_class: &ClassRef,
        name: &str,
        descriptor: MemberDescriptor,
        special_caller: Option<&ClassRef>,
    ) -> Result<MethodHandle> {
        let member = resolve(engine.as_ref(), ref_kind, reference_class, name, descriptor)?;
        Self::from_resolved(engine, ref_kind, reference_class, member, special_caller)
    }

    pub(crate) fn from_resolved(
        engine: Arc<dyn ExecutionEngine>,
        ref_kind: RefKind,
        reference_class: &ClassRef,
        member: ResolvedMember,
        special_caller: Option<&ClassRef>,
    ) -> Result<MethodHandle> {
        let receiver = match (ref_kind, special_caller) {
            (RefKind::InvokeSpecial, Some(caller)) => caller,
            (RefKind::NewInvokeSpecial, _) => &member.defining_class,
            _ => reference_class,
        };
        let ty = handle_type(ref_kind, receiver, &member.descriptor);
        let defining = member.defining_class.clone();
        let target = PrimitiveTarget {
            engine,
            ref_kind,
            reference_class: reference_class.clone(),
            slot: AtomicUsize::new(member.slot.0),
            member,
            special_caller: special_caller.cloned(),
        };
        let handle = Self::from_parts(ty, handle_kind(ref_kind), Payload::Primitive(Arc::new(target)))?;
        defining.handle_cache().track(&handle);
        Ok(handle)
    }
}

/// Member resolution with resolver failures mapped onto the error taxonomy.
pub(crate) fn resolve(
    engine: &dyn ExecutionEngine,
    ref_kind: RefKind,
    reference_class: &ClassRef,
    name: &str,
    descriptor: MemberDescriptor,
) -> Result<ResolvedMember> {
    engine
        .resolve(&MemberRequest {
            class: reference_class,
            name,
            descriptor: descriptor.clone(),
            kind: ref_kind,
        })
        .map_err(|err| {
            debug!(
                target: "invoke::lookup",
                class = %reference_class,
                name,
                %descriptor,
                kind = ?ref_kind,
                %err,
                "member resolution failed"
            );
            err.into_error(ref_kind)
        })
}

fn receiver(args: &[Value]) -> Result<&ObjRef> {
    match args.first() {
        Some(value) => require_object(value, "receiver"),
        None => Err(error::null_reference("receiver is missing")),
    }
}

pub(super) fn invoke(target: &PrimitiveTarget, mut args: Vec<Value>) -> Result<Value> {
    let engine = target.engine();
    match target.ref_kind() {
        RefKind::InvokeStatic => {
            engine.initialize(target.defining_class())?;
            engine.call(target.slot(), &args)
        }
        RefKind::InvokeSpecial => {
            receiver(&args)?;
            engine.call(target.slot(), &args)
        }
        RefKind::NewInvokeSpecial => {
            let class = target.defining_class();
            engine.initialize(class)?;
            let object = engine.allocate(class)?;
            args.insert(0, Value::object(object.clone()));
            engine.call(target.slot(), &args)?;
            Ok(Value::object(object))
        }
        RefKind::InvokeVirtual => {
            let receiver = receiver(&args)?;
            let address = engine.virtual_target(receiver.class(), target.slot().0)?;
            engine.call(address, &args)
        }
        RefKind::InvokeInterface => {
            let receiver = receiver(&args)?;
            let address = engine.interface_target(receiver.class(), target.defining_class(), target.slot().0)?;
            engine.call(address, &args)
        }
        RefKind::GetField => {
            let receiver = receiver(&args)?;
            engine.get_field(receiver, target.slot().0, target.is_volatile())
        }
        RefKind::PutField => {
            let receiver = receiver(&args)?.clone();
            let value = args.pop().unwrap_or(Value::NULL);
            engine.put_field(&receiver, target.slot().0, value, target.is_volatile())?;
            Ok(Value::Void)
        }
        RefKind::GetStatic => engine.get_static(target.defining_class(), target.slot().0, target.is_volatile()),
        RefKind::PutStatic => {
            let value = args.pop().unwrap_or(Value::NULL);
            engine.put_static(target.defining_class(), target.slot().0, value, target.is_volatile())?;
            Ok(Value::Void)
        }
    }
}

/// True for direct handles whose member takes no receiver.
pub(crate) fn is_static_member(target: &PrimitiveTarget) -> bool {
    target.modifiers() & ACC_STATIC != 0 || target.ref_kind() == RefKind::NewInvokeSpecial
}
