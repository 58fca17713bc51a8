//! Method handles.
//!
//! A handle is an immutable node: a [`MethodType`], a [`HandleKind`] and a
//! kind-specific payload. Combinators share their children, so a handle graph is a
//! DAG of reference-counted nodes. Retyping never mutates a node; it allocates a
//! new top-level node over the same payload.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::call_site::CallSiteRef;
use crate::class::ClassRef;
use crate::config;
use crate::error;
use crate::method_type::MethodType;
use crate::thunk::{self, DispatchDescriptor};
use crate::types::JType;
use crate::value::{ObjRef, Value};
use crate::var_handle::AccessMode;

mod adapt;
pub mod combinators;
pub mod constant;
pub mod control;
pub mod dump;
mod interp;
pub mod invokers;
pub mod kind;
pub(crate) mod primitive;
pub(crate) mod support;

pub use control::loops::LoopClause;
pub use kind::HandleKind;
pub use primitive::MemberInfo;
pub(crate) use primitive::PrimitiveTarget;

#[derive(Clone)]
pub(crate) enum Payload {
    Primitive(Arc<PrimitiveTarget>),
    Bound {
        next: MethodHandle,
        receiver: Value,
    },
    Constant(Value),
    Convert {
        next: MethodHandle,
    },
    Insert {
        next: MethodHandle,
        position: usize,
        values: Arc<[Value]>,
    },
    Permute {
        next: MethodHandle,
        reorder: Arc<[usize]>,
    },
    Collect {
        next: MethodHandle,
        position: usize,
        count: usize,
        component: JType,
    },
    Spread {
        next: MethodHandle,
        position: usize,
        count: usize,
        array_class: ClassRef,
    },
    FilterArguments {
        next: MethodHandle,
        start: usize,
        filters: Arc<[Option<MethodHandle>]>,
    },
    FilterReturn {
        next: MethodHandle,
        filter: MethodHandle,
    },
    Fold {
        next: MethodHandle,
        position: usize,
        combiner: MethodHandle,
        indices: Arc<[usize]>,
    },
    GuardWithTest {
        guard: MethodHandle,
        true_target: MethodHandle,
        false_target: MethodHandle,
    },
    Catch {
        try_target: MethodHandle,
        handler: MethodHandle,
        exception: ClassRef,
    },
    Finally {
        try_target: MethodHandle,
        cleanup: MethodHandle,
    },
    Loop {
        clauses: Arc<[control::loops::Clause]>,
    },
    VarargsCollector {
        next: MethodHandle,
        array_class: ClassRef,
    },
    Invoker {
        next_type: MethodType,
    },
    DynamicInvoker {
        site: CallSiteRef,
    },
    VarHandleInvoker {
        mode: AccessMode,
        mode_type: MethodType,
    },
}

pub(crate) struct HandleNode {
    ty: MethodType,
    kind: HandleKind,
    payload: Payload,
    thunks: OnceCell<Arc<DispatchDescriptor>>,
    custom_thunk: OnceCell<Arc<DispatchDescriptor>>,
    invocations: AtomicU32,
    as_type_cache: Mutex<Option<Weak<HandleNode>>>,
}

/// A typed, directly invokable reference to a method, field, constructor or a
/// composition of those.
#[derive(Clone)]
pub struct MethodHandle(pub(crate) Arc<HandleNode>);

impl MethodHandle {
    /// Allocates a node after checking the argument-slot limit.
    pub(crate) fn from_parts(ty: MethodType, kind: HandleKind, payload: Payload) -> Result<MethodHandle> {
        let limit = config::arity_limit();
        if ty.arg_slots() > limit {
            return Err(error::illegal_argument(format!(
                "{kind} handle type {ty} uses {} argument slots, limit is {limit}",
                ty.arg_slots()
            )));
        }
        Ok(Self::node(ty, kind, payload))
    }

    fn node(ty: MethodType, kind: HandleKind, payload: Payload) -> MethodHandle {
        MethodHandle(Arc::new(HandleNode {
            ty,
            kind,
            payload,
            thunks: OnceCell::new(),
            custom_thunk: OnceCell::new(),
            invocations: AtomicU32::new(0),
            as_type_cache: Mutex::new(None),
        }))
    }

    #[inline]
    pub fn method_type(&self) -> &MethodType {
        &self.0.ty
    }

    #[inline]
    pub fn kind(&self) -> HandleKind {
        self.0.kind
    }

    #[inline]
    pub(crate) fn payload(&self) -> &Payload {
        &self.0.payload
    }

    #[inline]
    pub fn ptr_eq(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) fn downgrade(&self) -> Weak<HandleNode> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<HandleNode>) -> Option<MethodHandle> {
        weak.upgrade().map(MethodHandle)
    }

    pub fn invocation_count(&self) -> u32 {
        self.0.invocations.load(Ordering::Relaxed)
    }

    pub fn to_value(&self) -> Value {
        Value::object(ObjRef::handle(self.clone()))
    }

    /// Same behavior under a different type. The caller guarantees `new_type` is a
    /// valid erasure or widening of the current type.
    pub fn clone_with_new_type(&self, new_type: MethodType) -> Result<MethodHandle> {
        if new_type == self.0.ty {
            return Ok(self.clone());
        }
        if new_type.parameter_count() != self.0.ty.parameter_count() {
            return Err(error::illegal_argument(format!(
                "cannot retype {} to {}: parameter counts differ",
                self.0.ty, new_type
            )));
        }
        Self::from_parts(new_type, self.0.kind, self.0.payload.clone())
    }

    /// The shared dispatch descriptor for this handle's shape.
    pub fn thunks(&self) -> Arc<DispatchDescriptor> {
        self.0
            .thunks
            .get_or_init(|| {
                thunk::ThunkTable::global().get(thunk::key_for(self, false), || thunk::template_for(self))
            })
            .clone()
    }

    /// The handle-specific descriptor, present once the invocation count reached the
    /// custom-thunk threshold.
    pub fn custom_thunk(&self) -> Option<Arc<DispatchDescriptor>> {
        self.0.custom_thunk.get().cloned()
    }

    fn count_invocation(&self) {
        let count = self.0.invocations.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if self.0.thunks.get().is_none() {
            self.thunks();
        }
        if count == config::custom_thunk_threshold() {
            self.0.custom_thunk.get_or_init(|| {
                debug!(
                    target: "invoke::thunk",
                    kind = %self.0.kind,
                    ty = %self.0.ty,
                    count,
                    "requesting custom thunk"
                );
                thunk::ThunkTable::global().get(thunk::key_for(self, true), || thunk::template_for(self))
            });
        }
    }

    /// Invocation with arguments already known to match this handle's type.
    pub(crate) fn invoke_basic(&self, args: Vec<Value>) -> Result<Value> {
        self.count_invocation();
        interp::dispatch(self, args)
    }

    /// Exact invocation: `call_type` must be identical to the handle's type and every
    /// argument must carry its parameter's type.
    pub fn invoke_exact(&self, call_type: &MethodType, args: Vec<Value>) -> Result<Value> {
        if *call_type != self.0.ty {
            return Err(error::wrong_method_type(format!(
                "handle type {} but invoked with {}",
                self.0.ty, call_type
            )));
        }
        self.check_arguments(&args)?;
        self.invoke_basic(args)
    }

    /// Adaptive invocation through [`MethodHandle::as_type`].
    pub fn invoke(&self, call_type: &MethodType, args: Vec<Value>) -> Result<Value> {
        self.as_type(call_type)?.invoke_exact(call_type, args)
    }

    /// Invocation through the generic `(Object...)Object` type; every argument is
    /// boxed and the result comes back boxed.
    pub fn invoke_with_arguments(&self, args: Vec<Value>) -> Result<Value> {
        let generic = MethodType::generic(args.len());
        let boxed = args.into_iter().map(Value::boxed).collect();
        self.as_type(&generic)?.invoke_exact(&generic, boxed)
    }

    fn check_arguments(&self, args: &[Value]) -> Result<()> {
        let params = self.0.ty.parameters();
        if args.len() != params.len() {
            return Err(error::wrong_method_type(format!(
                "{} expects {} arguments but got {}",
                self.0.ty,
                params.len(),
                args.len()
            )));
        }
        for (i, (arg, param)) in args.iter().zip(params).enumerate() {
            if !arg.matches(param) {
                return Err(error::wrong_method_type(format!(
                    "argument {i} of {}: expected {param} but found {arg:?}",
                    self.0.ty
                )));
            }
        }
        Ok(())
    }

    /// Member information for direct handles, `None` for composed ones.
    pub fn member_info(&self) -> Option<MemberInfo> {
        match self.payload() {
            Payload::Primitive(target) => Some(target.info(self.kind())),
            _ => None,
        }
    }

    /// The next handle in the chain for single-child kinds.
    pub fn next(&self) -> Option<&MethodHandle> {
        match self.payload() {
            Payload::Bound { next, .. }
            | Payload::Convert { next }
            | Payload::Insert { next, .. }
            | Payload::Permute { next, .. }
            | Payload::Collect { next, .. }
            | Payload::Spread { next, .. }
            | Payload::FilterArguments { next, .. }
            | Payload::FilterReturn { next, .. }
            | Payload::Fold { next, .. }
            | Payload::VarargsCollector { next, .. } => Some(next),
            _ => None,
        }
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle[{}]{}", self.0.kind, self.0.ty)
    }
}

impl fmt::Display for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle{}", self.0.ty)
    }
}

/// Null check shared by every kind that needs a receiver or a handle argument.
pub(crate) fn require_object<'a>(value: &'a Value, what: &str) -> Result<&'a ObjRef> {
    value
        .as_object()
        .ok_or_else(|| error::null_reference(format!("{what} is null")))
}

#[cfg(test)]
mod handle_test;
