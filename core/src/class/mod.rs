//! Loaded classes as the resolver hands them to the handle core.
//!
//! Classes are immutable after [`ClassBuilder::build`] except for three pieces of
//! runtime state: static storage, the one-shot initializer, and method bodies
//! swapped in by [`ClassRef::redefine_method`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock, Weak};
use std::thread::{self, ThreadId};

use anyhow::Result;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::error;
use crate::lookup::cache::HandleCache;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::util::sync::{lock, read, write};
use crate::value::Value;

pub mod flags {
    pub const ACC_PUBLIC: u32 = 0x0001;
    pub const ACC_PRIVATE: u32 = 0x0002;
    pub const ACC_PROTECTED: u32 = 0x0004;
    pub const ACC_STATIC: u32 = 0x0008;
    pub const ACC_FINAL: u32 = 0x0010;
    pub const ACC_VOLATILE: u32 = 0x0040;
    pub const ACC_VARARGS: u32 = 0x0080;
    pub const ACC_INTERFACE: u32 = 0x0200;
    pub const ACC_ABSTRACT: u32 = 0x0400;
}

use flags::*;

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

/// Native body of a guest method. Instance methods receive the receiver as `args[0]`.
pub type MethodBody = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Body of a class's `<clinit>`.
pub type ClassInitializer = Arc<dyn Fn(&ClassRef) -> Result<()> + Send + Sync>;

static NEXT_METHOD_ID: AtomicUsize = AtomicUsize::new(1);

pub struct Method {
    id: usize,
    name: Arc<str>,
    ty: MethodType,
    flags: u32,
    declaring: Weak<Class>,
    body: Option<MethodBody>,
    vtable_index: Option<usize>,
}

pub type MethodRef = Arc<Method>;

impl Method {
    /// Unique per method body; the heap engine uses it as the code address.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn method_type(&self) -> &MethodType {
        &self.ty
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags & ACC_STATIC != 0
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.flags & ACC_PRIVATE != 0
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flags & ACC_FINAL != 0
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        &*self.name == CONSTRUCTOR_NAME
    }

    #[inline]
    pub fn vtable_index(&self) -> Option<usize> {
        self.vtable_index
    }

    pub fn declaring_class(&self) -> Option<ClassRef> {
        self.declaring.upgrade().map(ClassRef)
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        match &self.body {
            Some(body) => body(args),
            None => Err(error::abstract_method(format!("{}{}", self.name, self.ty.descriptor()))),
        }
    }

    fn with_body(&self, body: MethodBody) -> Method {
        Method {
            id: NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name.clone(),
            ty: self.ty.clone(),
            flags: self.flags,
            declaring: self.declaring.clone(),
            body: Some(body),
            vtable_index: self.vtable_index,
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}#{}", self.name, self.ty.descriptor(), self.id)
    }
}

pub struct Field {
    name: Arc<str>,
    ty: JType,
    flags: u32,
    offset: usize,
    declaring: Weak<Class>,
}

impl Field {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> &JType {
        &self.ty
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags & ACC_STATIC != 0
    }

    #[inline]
    pub fn is_volatile(&self) -> bool {
        self.flags & ACC_VOLATILE != 0
    }

    /// Instance slot index, or static storage index for static fields.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn declaring_class(&self) -> Option<ClassRef> {
        self.declaring.upgrade().map(ClassRef)
    }
}

enum InitState {
    Uninitialized,
    Running(ThreadId),
    Initialized,
    Failed(String),
}

pub struct Class {
    name: Arc<str>,
    flags: u32,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    component: Option<JType>,
    methods: RwLock<Vec<MethodRef>>,
    vtable: RwLock<Vec<MethodRef>>,
    fields: Vec<Arc<Field>>,
    instance_types: Vec<JType>,
    statics: RwLock<Vec<Value>>,
    initializer: Option<ClassInitializer>,
    init_state: Mutex<InitState>,
    init_done: Condvar,
    subclasses: Mutex<Vec<Weak<Class>>>,
    generation: AtomicU64,
    handles: HandleCache,
}

/// Shared reference to a class; equality and hashing are by identity.
#[derive(Clone)]
pub struct ClassRef(Arc<Class>);

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl Deref for ClassRef {
    type Target = Class;

    fn deref(&self) -> &Class {
        &self.0
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name.replace('/', "."))
    }
}

impl Class {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.flags & ACC_INTERFACE != 0
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.flags & ACC_ABSTRACT != 0
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.flags & ACC_PUBLIC != 0
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.component.is_some()
    }

    #[inline]
    pub fn component_type(&self) -> Option<&JType> {
        self.component.as_ref()
    }

    #[inline]
    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    #[inline]
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    /// Bumped on every redefinition.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Package part of the internal name (`a/b` for `a/b/C`).
    pub fn package_name(&self) -> &str {
        if self.is_array() {
            return "";
        }
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }

    pub fn simple_name(&self) -> String {
        match &self.component {
            Some(component) => format!("{}[]", component.simple_name()),
            None => match self.name.rfind('/') {
                Some(idx) => self.name[idx + 1..].to_string(),
                None => self.name.to_string(),
            },
        }
    }

    pub fn descriptor(&self) -> String {
        if self.is_array() {
            self.name.to_string()
        } else {
            format!("L{};", self.name)
        }
    }

    pub fn declared_methods(&self) -> Vec<MethodRef> {
        read(&self.methods).clone()
    }

    pub fn declared_method(&self, name: &str, ty: &MethodType) -> Option<MethodRef> {
        read(&self.methods)
            .iter()
            .find(|m| m.name() == name && m.method_type() == ty)
            .cloned()
    }

    /// Index of `name`+`ty` among this interface's declared instance methods.
    pub fn interface_method_index(&self, name: &str, ty: &MethodType) -> Option<usize> {
        read(&self.methods)
            .iter()
            .filter(|m| !m.is_static())
            .position(|m| m.name() == name && m.method_type() == ty)
    }

    pub fn interface_method(&self, index: usize) -> Option<MethodRef> {
        read(&self.methods).iter().filter(|m| !m.is_static()).nth(index).cloned()
    }

    /// Method lookup through the superclass chain, then superinterfaces.
    pub fn find_method(&self, name: &str, ty: &MethodType) -> Option<MethodRef> {
        if let Some(m) = self.declared_method(name, ty) {
            return Some(m);
        }
        if let Some(found) = self.superclass.as_ref().and_then(|s| s.find_method(name, ty)) {
            return Some(found);
        }
        self.interfaces.iter().find_map(|i| i.find_method(name, ty))
    }

    pub fn declared_field(&self, name: &str) -> Option<Arc<Field>> {
        self.fields.iter().find(|f| f.name() == name).cloned()
    }

    pub fn find_field(&self, name: &str) -> Option<Arc<Field>> {
        if let Some(f) = self.declared_field(name) {
            return Some(f);
        }
        if let Some(found) = self.interfaces.iter().find_map(|i| i.find_field(name)) {
            return Some(found);
        }
        self.superclass.as_ref().and_then(|s| s.find_field(name))
    }

    pub fn vtable_entry(&self, index: usize) -> Option<MethodRef> {
        read(&self.vtable).get(index).cloned()
    }

    /// Most specific implementation for a receiver of this class: the vtable first,
    /// then default methods of the implemented interfaces.
    pub fn find_virtual_implementation(&self, name: &str, ty: &MethodType) -> Option<MethodRef> {
        let from_vtable = read(&self.vtable)
            .iter()
            .find(|m| m.name() == name && m.method_type() == ty)
            .cloned();
        if from_vtable.is_some() {
            return from_vtable;
        }
        self.find_default_method(name, ty)
    }

    fn find_default_method(&self, name: &str, ty: &MethodType) -> Option<MethodRef> {
        for iface in &self.interfaces {
            if let Some(m) = iface.declared_method(name, ty)
                && !m.is_abstract()
                && !m.is_static()
            {
                return Some(m);
            }
            if let Some(m) = iface.find_default_method(name, ty) {
                return Some(m);
            }
        }
        self.superclass.as_ref().and_then(|s| s.find_default_method(name, ty))
    }

    /// Field types for every instance slot, superclass slots first.
    #[inline]
    pub fn instance_field_types(&self) -> &[JType] {
        &self.instance_types
    }

    pub fn static_value(&self, offset: usize) -> Option<Value> {
        read(&self.statics).get(offset).cloned()
    }

    pub fn set_static_value(&self, offset: usize, value: Value) -> bool {
        match write(&self.statics).get_mut(offset) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*lock(&self.init_state), InitState::Initialized)
    }

    #[inline]
    pub(crate) fn handle_cache(&self) -> &HandleCache {
        &self.handles
    }
}

static ARRAY_CLASSES: Lazy<DashMap<JType, ClassRef>> = Lazy::new(DashMap::new);

impl ClassRef {
    /// Identity of the underlying class object.
    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// The array class with the given component type, created on first request.
    pub fn array_of(component: &JType) -> ClassRef {
        if let Some(existing) = ARRAY_CLASSES.get(component) {
            return existing.value().clone();
        }
        let wk = well_known();
        let built = ClassBuilder {
            name: format!("[{}", component.descriptor()),
            flags: ACC_PUBLIC | ACC_FINAL | ACC_ABSTRACT,
            superclass: Some(wk.object.clone()),
            interfaces: vec![wk.cloneable.clone(), wk.serializable.clone()],
            component: Some(component.clone()),
            methods: Vec::new(),
            fields: Vec::new(),
            initializer: None,
        }
        .build();
        ARRAY_CLASSES.entry(component.clone()).or_insert(built).value().clone()
    }

    pub fn array_class(&self) -> ClassRef {
        ClassRef::array_of(&JType::of(self))
    }

    /// True when `self` is `other`, a superclass of it, or an interface it implements.
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        if self == other {
            return true;
        }
        if self.interfaces.iter().any(|i| i.is_subclass_of(other)) {
            return true;
        }
        self.superclass.as_ref().is_some_and(|s| s.is_subclass_of(other))
    }

    /// `self := other` (reference widening, array covariance included).
    pub fn is_assignable_from(&self, other: &ClassRef) -> bool {
        if self == other || *self == well_known().object {
            return true;
        }
        if let (Some(to), Some(from)) = (self.component_type(), other.component_type()) {
            return match (to, from) {
                (JType::Ref(to), JType::Ref(from)) => to.is_assignable_from(from),
                _ => to == from,
            };
        }
        other.is_subclass_of(self)
    }

    pub fn is_instance(&self, value: &Value) -> bool {
        match value {
            Value::Ref(Some(obj)) => self.is_assignable_from(obj.class()),
            _ => false,
        }
    }

    /// Runs `<clinit>` once, superclass first. Recursive requests from the initializing
    /// thread return immediately; other threads wait for the outcome.
    pub fn ensure_initialized(&self) -> Result<()> {
        let me = thread::current().id();
        {
            let mut state = lock(&self.init_state);
            loop {
                match &*state {
                    InitState::Initialized => return Ok(()),
                    InitState::Failed(reason) => {
                        return Err(error::incompatible_class_change(format!(
                            "initialization of {} failed earlier: {}",
                            self, reason
                        )));
                    }
                    InitState::Running(owner) if *owner == me => return Ok(()),
                    InitState::Running(_) => {
                        state = self.init_done.wait(state).unwrap_or_else(std::sync::PoisonError::into_inner);
                    }
                    InitState::Uninitialized => {
                        *state = InitState::Running(me);
                        break;
                    }
                }
            }
        }

        let outcome = self.run_initializer();
        let mut state = lock(&self.init_state);
        *state = match &outcome {
            Ok(()) => InitState::Initialized,
            Err(err) => InitState::Failed(err.to_string()),
        };
        self.init_done.notify_all();
        outcome
    }

    fn run_initializer(&self) -> Result<()> {
        if let Some(superclass) = &self.superclass {
            superclass.ensure_initialized()?;
        }
        if let Some(init) = &self.initializer {
            debug!(target: "invoke::class", class = %self, "running class initializer");
            init(self)?;
        }
        Ok(())
    }

    /// Replaces the body of a declared method. The new body gets a fresh code address;
    /// vtables of this class and its subclasses are patched and cached handles on this
    /// class refresh their vmSlot in place.
    pub fn redefine_method<F>(&self, name: &str, ty: &MethodType, body: F) -> Result<MethodRef>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let body: MethodBody = Arc::new(body);
        let (old, new) = {
            let mut methods = write(&self.methods);
            let Some(pos) = methods.iter().position(|m| m.name() == name && m.method_type() == ty) else {
                return Err(error::no_such_method(format!("{}.{}{}", self, name, ty.descriptor())));
            };
            let old = methods[pos].clone();
            let new = Arc::new(old.with_body(body));
            methods[pos] = new.clone();
            (old, new)
        };
        if new.vtable_index.is_some() {
            self.patch_vtables(&old, &new);
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(
            target: "invoke::redefine",
            class = %self,
            method = name,
            generation,
            "method redefined"
        );
        self.handles.refresh_all();
        Ok(new)
    }

    fn patch_vtables(&self, old: &MethodRef, new: &MethodRef) {
        {
            let mut vtable = write(&self.vtable);
            for entry in vtable.iter_mut() {
                if Arc::ptr_eq(entry, old) {
                    *entry = new.clone();
                }
            }
        }
        let subclasses: Vec<ClassRef> = lock(&self.subclasses)
            .iter()
            .filter_map(|w| w.upgrade().map(ClassRef))
            .collect();
        for sub in subclasses {
            sub.patch_vtables(old, new);
        }
    }
}

struct MethodSpec {
    name: String,
    ty: MethodType,
    flags: u32,
    body: Option<MethodBody>,
}

struct FieldSpec {
    name: String,
    ty: JType,
    flags: u32,
}

/// Builder for guest classes.
pub struct ClassBuilder {
    name: String,
    flags: u32,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    component: Option<JType>,
    methods: Vec<MethodSpec>,
    fields: Vec<FieldSpec>,
    initializer: Option<ClassInitializer>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        Self::bare(name, ACC_PUBLIC, Some(well_known().object.clone()))
    }

    pub fn interface(name: &str) -> Self {
        Self::bare(name, ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT, None)
    }

    fn bare(name: &str, flags: u32, superclass: Option<ClassRef>) -> Self {
        Self {
            name: name.to_string(),
            flags,
            superclass,
            interfaces: Vec::new(),
            component: None,
            methods: Vec::new(),
            fields: Vec::new(),
            initializer: None,
        }
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn extends(mut self, superclass: &ClassRef) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    pub fn implements(mut self, interface: &ClassRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    pub fn method<F>(mut self, name: &str, ty: MethodType, flags: u32, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            ty,
            flags,
            body: Some(Arc::new(body)),
        });
        self
    }

    pub fn abstract_method(mut self, name: &str, ty: MethodType, flags: u32) -> Self {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            ty,
            flags: flags | ACC_ABSTRACT,
            body: None,
        });
        self
    }

    /// Declares `<init>`; `ty` lists the constructor parameters and returns void.
    pub fn constructor<F>(self, ty: MethodType, flags: u32, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.method(CONSTRUCTOR_NAME, ty, flags, body)
    }

    pub fn field(mut self, name: &str, ty: JType, flags: u32) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            ty,
            flags,
        });
        self
    }

    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&ClassRef) -> Result<()> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(init));
        self
    }

    pub fn build(self) -> ClassRef {
        let ClassBuilder {
            name,
            flags,
            superclass,
            interfaces,
            component,
            methods: method_specs,
            fields: field_specs,
            initializer,
        } = self;
        let is_interface = flags & ACC_INTERFACE != 0;
        let mut instance_types: Vec<JType> = superclass
            .as_ref()
            .map(|s| s.instance_types.clone())
            .unwrap_or_default();
        let inherited_vtable: Vec<MethodRef> = superclass
            .as_ref()
            .map(|s| read(&s.vtable).clone())
            .unwrap_or_default();

        let class = Arc::new_cyclic(|weak: &Weak<Class>| {
            let mut vtable = inherited_vtable;
            let mut methods = Vec::with_capacity(method_specs.len());
            for spec in method_specs {
                let dispatched = !is_interface
                    && spec.flags & (ACC_STATIC | ACC_PRIVATE) == 0
                    && spec.name != CONSTRUCTOR_NAME;
                let vtable_index = dispatched.then(|| {
                    vtable
                        .iter()
                        .position(|m| m.name() == spec.name && *m.method_type() == spec.ty)
                        .unwrap_or(vtable.len())
                });
                let method = Arc::new(Method {
                    id: NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed),
                    name: spec.name.into(),
                    ty: spec.ty,
                    flags: spec.flags,
                    declaring: weak.clone(),
                    body: spec.body,
                    vtable_index,
                });
                if let Some(index) = vtable_index {
                    if index == vtable.len() {
                        vtable.push(method.clone());
                    } else {
                        vtable[index] = method.clone();
                    }
                }
                methods.push(method);
            }

            let mut statics = Vec::new();
            let mut fields = Vec::with_capacity(field_specs.len());
            for spec in field_specs {
                let offset = if spec.flags & ACC_STATIC != 0 {
                    statics.push(Value::zero(&spec.ty));
                    statics.len() - 1
                } else {
                    instance_types.push(spec.ty.clone());
                    instance_types.len() - 1
                };
                fields.push(Arc::new(Field {
                    name: spec.name.into(),
                    ty: spec.ty,
                    flags: spec.flags,
                    offset,
                    declaring: weak.clone(),
                }));
            }

            Class {
                name: name.into(),
                flags,
                superclass: superclass.clone(),
                interfaces,
                component,
                methods: RwLock::new(methods),
                vtable: RwLock::new(vtable),
                fields,
                instance_types,
                statics: RwLock::new(statics),
                initializer,
                init_state: Mutex::new(InitState::Uninitialized),
                init_done: Condvar::new(),
                subclasses: Mutex::new(Vec::new()),
                generation: AtomicU64::new(0),
                handles: HandleCache::default(),
            }
        });

        if let Some(superclass) = &superclass {
            let mut subs = lock(&superclass.subclasses);
            subs.retain(|w| w.strong_count() > 0);
            subs.push(Arc::downgrade(&class));
        }
        ClassRef(class)
    }
}

/// Classes the handle core itself needs: the root, the throwable hierarchy used for
/// the error taxonomy, primitive wrappers and the handle-related types.
pub struct WellKnown {
    pub object: ClassRef,
    pub cloneable: ClassRef,
    pub serializable: ClassRef,
    pub comparable: ClassRef,
    pub iterator: ClassRef,
    pub iterable: ClassRef,
    pub number: ClassRef,
    pub boolean: ClassRef,
    pub byte: ClassRef,
    pub character: ClassRef,
    pub short: ClassRef,
    pub integer: ClassRef,
    pub long: ClassRef,
    pub float: ClassRef,
    pub double: ClassRef,
    pub string: ClassRef,
    pub method_handle: ClassRef,
    pub call_site: ClassRef,
    pub var_handle: ClassRef,
    pub throwable: ClassRef,
    pub exception: ClassRef,
    pub runtime_exception: ClassRef,
    pub error: ClassRef,
    pub reflective_operation: ClassRef,
    pub no_such_method: ClassRef,
    pub no_such_field: ClassRef,
    pub illegal_access: ClassRef,
    pub wrong_method_type: ClassRef,
    pub illegal_argument: ClassRef,
    pub null_pointer: ClassRef,
    pub class_cast: ClassRef,
    pub illegal_state: ClassRef,
    pub unsupported_operation: ClassRef,
    pub arithmetic: ClassRef,
    pub index_out_of_bounds: ClassRef,
    pub array_index_out_of_bounds: ClassRef,
    pub array_store: ClassRef,
    pub negative_array_size: ClassRef,
    pub linkage_error: ClassRef,
    pub incompatible_class_change: ClassRef,
    pub abstract_method: ClassRef,
}

static WELL_KNOWN: Lazy<WellKnown> = Lazy::new(|| {
    let object = ClassBuilder::bare("java/lang/Object", ACC_PUBLIC, None).build();
    let iface = |name: &str| ClassBuilder::bare(name, ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT, None).build();
    let class = |name: &str, superclass: &ClassRef| {
        ClassBuilder::bare(name, ACC_PUBLIC, Some(superclass.clone())).build()
    };
    let final_class = |name: &str, superclass: &ClassRef, interfaces: &[&ClassRef]| {
        let mut b = ClassBuilder::bare(name, ACC_PUBLIC | ACC_FINAL, Some(superclass.clone()));
        for i in interfaces {
            b = b.implements(i);
        }
        b.build()
    };

    let cloneable = iface("java/lang/Cloneable");
    let serializable = iface("java/io/Serializable");
    let comparable = iface("java/lang/Comparable");
    let iterator = ClassBuilder::interface("java/util/Iterator")
        .abstract_method("hasNext", MethodType::method_type(JType::Boolean, vec![]), ACC_PUBLIC)
        .abstract_method("next", MethodType::method_type(JType::Ref(object.clone()), vec![]), ACC_PUBLIC)
        .build();
    let iterable = ClassBuilder::interface("java/lang/Iterable")
        .abstract_method("iterator", MethodType::method_type(JType::Ref(iterator.clone()), vec![]), ACC_PUBLIC)
        .build();
    let number = ClassBuilder::bare("java/lang/Number", ACC_PUBLIC | ACC_ABSTRACT, Some(object.clone()))
        .implements(&serializable)
        .build();
    let boxed = |name: &str, superclass: &ClassRef| final_class(name, superclass, &[&serializable, &comparable]);

    let throwable = ClassBuilder::bare("java/lang/Throwable", ACC_PUBLIC, Some(object.clone()))
        .implements(&serializable)
        .build();
    let exception = class("java/lang/Exception", &throwable);
    let runtime_exception = class("java/lang/RuntimeException", &exception);
    let error = class("java/lang/Error", &throwable);
    let reflective_operation = class("java/lang/ReflectiveOperationException", &exception);
    let illegal_argument = class("java/lang/IllegalArgumentException", &runtime_exception);
    let index_out_of_bounds = class("java/lang/IndexOutOfBoundsException", &runtime_exception);
    let linkage_error = class("java/lang/LinkageError", &error);
    let incompatible_class_change = class("java/lang/IncompatibleClassChangeError", &linkage_error);

    WellKnown {
        boolean: boxed("java/lang/Boolean", &object),
        byte: boxed("java/lang/Byte", &number),
        character: boxed("java/lang/Character", &object),
        short: boxed("java/lang/Short", &number),
        integer: boxed("java/lang/Integer", &number),
        long: boxed("java/lang/Long", &number),
        float: boxed("java/lang/Float", &number),
        double: boxed("java/lang/Double", &number),
        string: final_class("java/lang/String", &object, &[&serializable, &comparable]),
        method_handle: ClassBuilder::bare("java/lang/invoke/MethodHandle", ACC_PUBLIC | ACC_ABSTRACT, Some(object.clone()))
            .build(),
        call_site: ClassBuilder::bare("java/lang/invoke/CallSite", ACC_PUBLIC | ACC_ABSTRACT, Some(object.clone()))
            .build(),
        var_handle: ClassBuilder::bare("java/lang/invoke/VarHandle", ACC_PUBLIC | ACC_ABSTRACT, Some(object.clone()))
            .build(),
        no_such_method: class("java/lang/NoSuchMethodException", &reflective_operation),
        no_such_field: class("java/lang/NoSuchFieldException", &reflective_operation),
        illegal_access: class("java/lang/IllegalAccessException", &reflective_operation),
        wrong_method_type: class("java/lang/invoke/WrongMethodTypeException", &runtime_exception),
        null_pointer: class("java/lang/NullPointerException", &runtime_exception),
        class_cast: class("java/lang/ClassCastException", &runtime_exception),
        illegal_state: class("java/lang/IllegalStateException", &runtime_exception),
        unsupported_operation: class("java/lang/UnsupportedOperationException", &runtime_exception),
        arithmetic: class("java/lang/ArithmeticException", &runtime_exception),
        array_index_out_of_bounds: class("java/lang/ArrayIndexOutOfBoundsException", &index_out_of_bounds),
        array_store: class("java/lang/ArrayStoreException", &runtime_exception),
        negative_array_size: class("java/lang/NegativeArraySizeException", &runtime_exception),
        abstract_method: class("java/lang/AbstractMethodError", &incompatible_class_change),
        object,
        cloneable,
        serializable,
        comparable,
        iterator,
        iterable,
        number,
        throwable,
        exception,
        runtime_exception,
        error,
        reflective_operation,
        illegal_argument,
        index_out_of_bounds,
        linkage_error,
        incompatible_class_change,
    }
});

#[inline]
pub fn well_known() -> &'static WellKnown {
    &WELL_KNOWN
}
