//! Member lookup: finds methods, constructors and fields and turns them into direct
//! handles or var handles, subject to the lookup's access modes.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::class::flags::{ACC_FINAL, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC};
use crate::class::{CLASS_INITIALIZER_NAME, CONSTRUCTOR_NAME, ClassRef, Field, MethodRef, well_known};
use crate::engine::{ExecutionEngine, MemberDescriptor, RefKind, ResolvedMember, default_engine};
use crate::error;
use crate::handle::primitive::resolve;
use crate::handle::{MemberInfo, MethodHandle, Payload};
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;
use crate::var_handle::VarHandle;

pub mod cache;

use cache::{CacheKey, CacheTable};

pub const PUBLIC: u32 = 0x01;
pub const PRIVATE: u32 = 0x02;
pub const PROTECTED: u32 = 0x04;
pub const PACKAGE: u32 = 0x08;
pub const MODULE: u32 = 0x10;
pub const UNCONDITIONAL: u32 = 0x20;

const FULL_POWER: u32 = PUBLIC | PRIVATE | PROTECTED | PACKAGE | MODULE;

/// A lookup context: the class lookups are performed from, what it may see and
/// the engine resolved members are bound to.
#[derive(Clone)]
pub struct Lookup {
    lookup_class: ClassRef,
    modes: u32,
    engine: Arc<dyn ExecutionEngine>,
}

impl Lookup {
    /// A full-power lookup on `lookup_class` backed by the default engine.
    pub fn new(lookup_class: &ClassRef) -> Lookup {
        Self::with_engine(lookup_class, default_engine())
    }

    pub fn with_engine(lookup_class: &ClassRef, engine: Arc<dyn ExecutionEngine>) -> Lookup {
        Lookup {
            lookup_class: lookup_class.clone(),
            modes: FULL_POWER,
            engine,
        }
    }

    /// Sees public members of public classes only.
    pub fn public_lookup() -> Lookup {
        Lookup {
            lookup_class: well_known().object.clone(),
            modes: UNCONDITIONAL,
            engine: default_engine(),
        }
    }

    pub fn lookup_class(&self) -> &ClassRef {
        &self.lookup_class
    }

    pub fn lookup_modes(&self) -> u32 {
        self.modes
    }

    pub fn has_full_privilege_access(&self) -> bool {
        self.modes & (PRIVATE | MODULE) == PRIVATE | MODULE
    }

    /// The same lookup teleported to `target`. Private and protected access never
    /// survive the move; package access survives only inside the same package.
    pub fn in_class(&self, target: &ClassRef) -> Lookup {
        if *target == self.lookup_class {
            return self.clone();
        }
        let mut modes = self.modes & !(PRIVATE | PROTECTED);
        if target.package_name() != self.lookup_class.package_name() {
            modes &= !(PACKAGE | MODULE);
        }
        if modes & (PUBLIC | UNCONDITIONAL) != 0 && !target.is_public() && modes & PACKAGE == 0 {
            modes = 0;
        }
        Lookup {
            lookup_class: target.clone(),
            modes,
            engine: self.engine.clone(),
        }
    }

    /// Drops `mode` and every weaker mode that depends on it.
    pub fn drop_lookup_mode(&self, mode: u32) -> Result<Lookup> {
        let modes = match mode {
            PUBLIC => 0,
            MODULE => self.modes & (PUBLIC | UNCONDITIONAL),
            PACKAGE => self.modes & (PUBLIC | MODULE | UNCONDITIONAL),
            PRIVATE => self.modes & !(PRIVATE | PROTECTED),
            PROTECTED | UNCONDITIONAL => self.modes & !mode,
            _ => return Err(error::illegal_argument(format!("{mode:#x} is not a single lookup mode"))),
        };
        Ok(Lookup {
            lookup_class: self.lookup_class.clone(),
            modes,
            engine: self.engine.clone(),
        })
    }

    pub fn find_static(&self, class: &ClassRef, name: &str, ty: &MethodType) -> Result<MethodHandle> {
        check_method_name(class, name)?;
        let member = self.resolve(RefKind::InvokeStatic, class, name, MemberDescriptor::Method(ty.clone()))?;
        self.check_access(class, &member)?;
        self.cached(CacheTable::Static, class, name, ty, None, || {
            MethodHandle::from_resolved(self.engine.clone(), RefKind::InvokeStatic, class, member, None)
        })
    }

    /// Interface methods give an interface handle, private and final methods a
    /// direct special handle, everything else a virtual handle.
    pub fn find_virtual(&self, class: &ClassRef, name: &str, ty: &MethodType) -> Result<MethodHandle> {
        check_method_name(class, name)?;
        let descriptor = MemberDescriptor::Method(ty.clone());
        let direct = self.resolve(RefKind::InvokeSpecial, class, name, descriptor.clone())?;
        self.check_access(class, &direct)?;

        let devirtualize = direct.modifiers & (ACC_PRIVATE | ACC_FINAL) != 0;
        if devirtualize {
            return self.cached(CacheTable::Special, class, name, ty, Some(class), || {
                MethodHandle::from_resolved(self.engine.clone(), RefKind::InvokeSpecial, class, direct, Some(class))
            });
        }
        let kind = if class.is_interface() {
            RefKind::InvokeInterface
        } else {
            RefKind::InvokeVirtual
        };
        let member = self.resolve(kind, class, name, descriptor)?;
        self.cached(CacheTable::Virtual, class, name, ty, None, || {
            MethodHandle::from_resolved(self.engine.clone(), kind, class, member, None)
        })
    }

    /// A non-virtual call of `class.name` as seen from `special_caller`, which must be
    /// the lookup class itself.
    pub fn find_special(
        &self,
        class: &ClassRef,
        name: &str,
        ty: &MethodType,
        special_caller: &ClassRef,
    ) -> Result<MethodHandle> {
        check_method_name(class, name)?;
        if self.modes & PRIVATE == 0 || *special_caller != self.lookup_class {
            return Err(error::illegal_access(format!(
                "no private access for invokespecial from {special_caller} via {}",
                self.lookup_class
            )));
        }
        if !class.is_assignable_from(special_caller) {
            return Err(error::illegal_access(format!("{special_caller} is not a subtype of {class}")));
        }
        let member = self.resolve(RefKind::InvokeSpecial, class, name, MemberDescriptor::Method(ty.clone()))?;
        self.check_access(class, &member)?;
        self.cached(CacheTable::Special, class, name, ty, Some(special_caller), || {
            MethodHandle::from_resolved(
                self.engine.clone(),
                RefKind::InvokeSpecial,
                class,
                member,
                Some(special_caller),
            )
        })
    }

    /// `ty` lists the constructor parameters and returns void; the handle returns the
    /// new instance.
    pub fn find_constructor(&self, class: &ClassRef, ty: &MethodType) -> Result<MethodHandle> {
        if !ty.return_type().is_void() {
            return Err(error::no_such_method(format!("constructor type {ty} must return void")));
        }
        if class.is_interface() || class.is_abstract() || class.is_array() {
            return Err(error::illegal_access(format!("{class} cannot be instantiated")));
        }
        let member = self.resolve(
            RefKind::NewInvokeSpecial,
            class,
            CONSTRUCTOR_NAME,
            MemberDescriptor::Method(ty.clone()),
        )?;
        self.check_access(class, &member)?;
        MethodHandle::from_resolved(self.engine.clone(), RefKind::NewInvokeSpecial, class, member, None)
    }

    pub fn find_getter(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<MethodHandle> {
        self.field_handle(RefKind::GetField, class, name, ty)
    }

    pub fn find_setter(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<MethodHandle> {
        self.field_handle(RefKind::PutField, class, name, ty)
    }

    pub fn find_static_getter(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<MethodHandle> {
        self.field_handle(RefKind::GetStatic, class, name, ty)
    }

    pub fn find_static_setter(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<MethodHandle> {
        self.field_handle(RefKind::PutStatic, class, name, ty)
    }

    pub fn find_var_handle(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<VarHandle> {
        self.var_handle(RefKind::GetField, RefKind::PutField, class, name, ty)
    }

    pub fn find_static_var_handle(&self, class: &ClassRef, name: &str, ty: &JType) -> Result<VarHandle> {
        self.var_handle(RefKind::GetStatic, RefKind::PutStatic, class, name, ty)
    }

    /// `find_virtual` on the receiver's class, bound to `receiver`.
    pub fn bind(&self, receiver: &Value, name: &str, ty: &MethodType) -> Result<MethodHandle> {
        let object = receiver
            .as_object()
            .ok_or_else(|| error::null_reference("bind receiver is null"))?;
        let class = object.class().clone();
        self.find_virtual(&class, name, ty)?.bind_to(receiver.clone())
    }

    /// A handle for a method obtained by reflection.
    pub fn unreflect(&self, method: &MethodRef) -> Result<MethodHandle> {
        let class = declaring(method.declaring_class(), method.name())?;
        if method.is_constructor() {
            self.find_constructor(&class, method.method_type())
        } else if method.is_static() {
            self.find_static(&class, method.name(), method.method_type())
        } else {
            self.find_virtual(&class, method.name(), method.method_type())
        }
    }

    /// `find_special` on a reflected method.
    pub fn unreflect_special(&self, method: &MethodRef, special_caller: &ClassRef) -> Result<MethodHandle> {
        let class = declaring(method.declaring_class(), method.name())?;
        self.find_special(&class, method.name(), method.method_type(), special_caller)
    }

    pub fn unreflect_getter(&self, field: &Field) -> Result<MethodHandle> {
        let class = declaring(field.declaring_class(), field.name())?;
        let kind = if field.is_static() { RefKind::GetStatic } else { RefKind::GetField };
        self.field_handle(kind, &class, field.name(), field.field_type())
    }

    /// Fails with IllegalAccess for final fields.
    pub fn unreflect_setter(&self, field: &Field) -> Result<MethodHandle> {
        let class = declaring(field.declaring_class(), field.name())?;
        let kind = if field.is_static() { RefKind::PutStatic } else { RefKind::PutField };
        self.field_handle(kind, &class, field.name(), field.field_type())
    }

    pub fn unreflect_var_handle(&self, field: &Field) -> Result<VarHandle> {
        let class = declaring(field.declaring_class(), field.name())?;
        if field.is_static() {
            self.find_static_var_handle(&class, field.name(), field.field_type())
        } else {
            self.find_var_handle(&class, field.name(), field.field_type())
        }
    }

    /// A full-power lookup on `target` for a caller whose lookup has module access.
    pub fn private_lookup_in(target: &ClassRef, caller: &Lookup) -> Result<Lookup> {
        if target.is_array() {
            return Err(error::illegal_argument(format!("{target} is an array class")));
        }
        if caller.modes & MODULE == 0 {
            return Err(error::illegal_access(format!(
                "{caller} lacks module access ({:#x}) for a private lookup in {target}",
                MODULE
            )));
        }
        debug!(target: "invoke::lookup", caller = %caller, %target, "private lookup");
        Ok(Lookup::with_engine(target, caller.engine.clone()))
    }

    /// Member information for a direct handle whose member this lookup can access.
    pub fn reveal_direct(&self, handle: &MethodHandle) -> Result<MemberInfo> {
        let (info, reference, defining, modifiers) = match handle.payload() {
            Payload::Primitive(target) => (
                target.info(handle.kind()),
                target.reference_class().clone(),
                target.defining_class().clone(),
                target.modifiers(),
            ),
            _ => {
                return Err(error::illegal_argument(format!("{handle:?} is not a direct method handle")));
            }
        };
        if !self.can_access(&reference, &defining, modifiers) {
            return Err(error::illegal_argument(format!(
                "{} cannot see {}.{}",
                self.lookup_class, info.declaring_class, info.name
            )));
        }
        Ok(info)
    }

    fn resolve(
        &self,
        kind: RefKind,
        class: &ClassRef,
        name: &str,
        descriptor: MemberDescriptor,
    ) -> Result<ResolvedMember> {
        resolve(self.engine.as_ref(), kind, class, name, descriptor)
    }

    fn cached<F>(
        &self,
        table: CacheTable,
        class: &ClassRef,
        name: &str,
        ty: &MethodType,
        caller: Option<&ClassRef>,
        create: F,
    ) -> Result<MethodHandle>
    where
        F: FnOnce() -> Result<MethodHandle>,
    {
        let key = CacheKey {
            name: name.into(),
            ty: ty.clone(),
            caller: caller.cloned(),
        };
        class.handle_cache().get_or_insert(table, key, create)
    }

    fn field_handle(&self, kind: RefKind, class: &ClassRef, name: &str, ty: &JType) -> Result<MethodHandle> {
        let member = self.resolve(kind, class, name, MemberDescriptor::Field(ty.clone()))?;
        self.check_access(class, &member)?;
        if kind.is_setter() && member.modifiers & ACC_FINAL != 0 {
            return Err(error::illegal_access(format!("{class}.{name} is final")));
        }
        MethodHandle::from_resolved(self.engine.clone(), kind, class, member, None)
    }

    fn var_handle(
        &self,
        get: RefKind,
        put: RefKind,
        class: &ClassRef,
        name: &str,
        ty: &JType,
    ) -> Result<VarHandle> {
        let member = self.resolve(get, class, name, MemberDescriptor::Field(ty.clone()))?;
        self.check_access(class, &member)?;
        let setter = if member.modifiers & ACC_FINAL == 0 {
            let put_member = self.resolve(put, class, name, MemberDescriptor::Field(ty.clone()))?;
            Some(MethodHandle::from_resolved(self.engine.clone(), put, class, put_member, None)?)
        } else {
            None
        };
        let getter = MethodHandle::from_resolved(self.engine.clone(), get, class, member, None)?;
        Ok(VarHandle::field(getter, setter))
    }

    fn check_access(&self, ref_class: &ClassRef, member: &ResolvedMember) -> Result<()> {
        if self.can_access(ref_class, &member.defining_class, member.modifiers) {
            return Ok(());
        }
        debug!(
            target: "invoke::lookup",
            lookup = %self.lookup_class,
            modes = self.modes,
            class = %ref_class,
            member = %member.name,
            "access denied"
        );
        Err(error::illegal_access(format!(
            "{}.{} is not accessible from {}",
            member.defining_class, member.name, self
        )))
    }

    fn can_access(&self, ref_class: &ClassRef, defining: &ClassRef, modifiers: u32) -> bool {
        let modes = self.modes;
        if modes == 0 {
            return false;
        }
        let same_package = |class: &ClassRef| class.package_name() == self.lookup_class.package_name();

        let class_visible = ref_class.is_public() || (modes & PACKAGE != 0 && same_package(ref_class));
        if !class_visible {
            return false;
        }
        if modifiers & ACC_PUBLIC != 0 {
            return modes & (PUBLIC | UNCONDITIONAL) != 0;
        }
        if modes & UNCONDITIONAL != 0 && modes & PUBLIC == 0 {
            return false;
        }
        if modifiers & ACC_PRIVATE != 0 {
            return modes & PRIVATE != 0 && *defining == self.lookup_class;
        }
        let package_ok = modes & PACKAGE != 0 && same_package(defining);
        if modifiers & ACC_PROTECTED != 0 {
            let subclass_ok = modes & PROTECTED != 0 && self.lookup_class.is_subclass_of(defining);
            return package_ok || subclass_ok;
        }
        package_ok
    }
}

fn declaring(class: Option<ClassRef>, member: &str) -> Result<ClassRef> {
    class.ok_or_else(|| error::no_such_method(format!("the class declaring {member} has been unloaded")))
}

fn check_method_name(class: &ClassRef, name: &str) -> Result<()> {
    if name == CONSTRUCTOR_NAME || name == CLASS_INITIALIZER_NAME {
        return Err(error::no_such_method(format!("{class}.{name} is not a regular method")));
    }
    Ok(())
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modes {
            FULL_POWER => write!(f, "{}", self.lookup_class),
            0 => write!(f, "{}/noaccess", self.lookup_class),
            UNCONDITIONAL => write!(f, "{}/publicLookup", self.lookup_class),
            modes => write!(f, "{}/{modes:#x}", self.lookup_class),
        }
    }
}
