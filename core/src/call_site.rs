//! Call sites: the holders `invokedynamic` links against.
//!
//! Three flavors differ in how a target change becomes visible. A constant site
//! binds once. A volatile site publishes every write immediately. A mutable site
//! tracks the target its dispatch code was specialized for (its epoch) and only
//! invalidates that code when the new target is not structurally equivalent.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering, fence};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::compare::StructuralComparator;
use crate::config;
use crate::error;
use crate::handle::{HandleKind, MethodHandle, Payload};
use crate::method_type::MethodType;
use crate::util::sync::{lock, read, write};
use crate::value::{ObjRef, Value};

/// Told when the dispatch code specialized for a mutable site's epoch is void.
pub trait Invalidator: Send + Sync {
    fn invalidate(&self, site: &MutableCallSite);
}

/// Invalidator for sites with no dependent generated code.
pub struct NoInvalidation;

impl Invalidator for NoInvalidation {
    fn invalidate(&self, _site: &MutableCallSite) {}
}

static NEXT_SITE_ID: AtomicUsize = AtomicUsize::new(1);

fn check_target(ty: &MethodType, target: &MethodHandle) -> Result<()> {
    if target.method_type() != ty {
        return Err(error::wrong_method_type(format!(
            "call site type {} but target type {}",
            ty,
            target.method_type()
        )));
    }
    Ok(())
}

pub struct ConstantCallSite {
    ty: MethodType,
    target: OnceCell<MethodHandle>,
}

impl ConstantCallSite {
    pub fn new(target: &MethodHandle) -> CallSiteRef {
        CallSiteRef::Constant(Arc::new(Self {
            ty: target.method_type().clone(),
            target: OnceCell::with_value(target.clone()),
        }))
    }

    /// Binds through `hook`, which is invoked once with the unbound site and must
    /// return a handle of exactly `ty`.
    pub fn with_hook(ty: &MethodType, hook: &MethodHandle) -> Result<CallSiteRef> {
        let site = Arc::new(Self {
            ty: ty.clone(),
            target: OnceCell::new(),
        });
        let site_ref = CallSiteRef::Constant(site.clone());
        let result = hook.invoke_with_arguments(vec![site_ref.to_value()])?;
        let object = result
            .as_object()
            .ok_or_else(|| error::null_reference("call site hook returned null"))?;
        let target = object
            .as_handle()
            .ok_or_else(|| error::class_cast(format!("{} cannot be cast to MethodHandle", object.class())))?;
        check_target(ty, target)?;
        // a hook that bound the site re-entrantly already won
        let _ = site.target.set(target.clone());
        Ok(site_ref)
    }

    pub fn target(&self) -> Result<MethodHandle> {
        self.target
            .get()
            .cloned()
            .ok_or_else(|| error::illegal_state("constant call site target read before it was bound"))
    }
}

pub struct VolatileCallSite {
    ty: MethodType,
    target: RwLock<MethodHandle>,
}

impl VolatileCallSite {
    pub fn new(target: &MethodHandle) -> CallSiteRef {
        CallSiteRef::Volatile(Arc::new(Self {
            ty: target.method_type().clone(),
            target: RwLock::new(target.clone()),
        }))
    }

    pub fn target(&self) -> MethodHandle {
        read(&self.target).clone()
    }

    pub fn set_target(&self, target: &MethodHandle) -> Result<()> {
        check_target(&self.ty, target)?;
        *write(&self.target) = target.clone();
        Ok(())
    }
}

#[derive(Default)]
struct Backoff {
    /// Updates still to skip the equivalence check for.
    skip: u32,
    /// Length of the next skip run after a failed check.
    interval: u32,
}

pub struct MutableCallSite {
    id: usize,
    ty: MethodType,
    target: RwLock<MethodHandle>,
    epoch: RwLock<Option<MethodHandle>>,
    writer: Mutex<Backoff>,
    /// The thread running the invalidator, if any.
    invalidating: RwLock<Option<ThreadId>>,
    invalidator: Arc<dyn Invalidator>,
}

impl MutableCallSite {
    pub fn new(target: &MethodHandle) -> CallSiteRef {
        Self::with_invalidator(target, Arc::new(NoInvalidation))
    }

    pub fn with_invalidator(target: &MethodHandle, invalidator: Arc<dyn Invalidator>) -> CallSiteRef {
        CallSiteRef::Mutable(Arc::new(Self {
            id: NEXT_SITE_ID.fetch_add(1, Ordering::Relaxed),
            ty: target.method_type().clone(),
            target: RwLock::new(target.clone()),
            epoch: RwLock::new(Some(target.clone())),
            writer: Mutex::new(Backoff::default()),
            invalidating: RwLock::new(None),
            invalidator,
        }))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn method_type(&self) -> &MethodType {
        &self.ty
    }

    pub fn target(&self) -> MethodHandle {
        read(&self.target).clone()
    }

    /// The target dispatch code currently assumes; `None` while an update is
    /// between invalidation and installation.
    pub fn epoch(&self) -> Option<MethodHandle> {
        read(&self.epoch).clone()
    }

    /// Writers are serialized per site. An equivalent target is swapped in without
    /// invalidation; otherwise the epoch is cleared, dependents are invalidated,
    /// and only then are the target and the new epoch installed.
    ///
    /// The writer lock is held across [`Invalidator::invalidate`]; an invalidator
    /// that calls back into `set_target` on the same site gets IllegalState.
    pub fn set_target(&self, target: &MethodHandle) -> Result<()> {
        check_target(&self.ty, target)?;
        let current = thread::current().id();
        if *read(&self.invalidating) == Some(current) {
            return Err(error::illegal_state(format!(
                "call site {} updated from its own invalidator",
                self.id
            )));
        }
        let mut backoff = lock(&self.writer);
        let equivalent = if backoff.skip > 0 {
            backoff.skip -= 1;
            false
        } else {
            let same = self
                .epoch()
                .is_some_and(|epoch| StructuralComparator::equivalent(&epoch, target));
            if same {
                backoff.interval = 0;
            } else {
                let cap = config::equivalence_backoff_cap();
                backoff.interval = backoff.interval.saturating_mul(2).clamp(1, cap.max(1));
                backoff.skip = backoff.interval;
                trace!(
                    target: "invoke::callsite",
                    site = self.id,
                    skip = backoff.skip,
                    "equivalence check failed, backing off"
                );
            }
            same
        };
        if equivalent {
            *write(&self.target) = target.clone();
            return Ok(());
        }
        *write(&self.epoch) = None;
        debug!(target: "invoke::callsite", site = self.id, ty = %self.ty, "invalidating dependent dispatch code");
        *write(&self.invalidating) = Some(current);
        self.invalidator.invalidate(self);
        *write(&self.invalidating) = None;
        *write(&self.target) = target.clone();
        *write(&self.epoch) = Some(target.clone());
        Ok(())
    }
}

/// Shared reference to a call site of any flavor; equality is identity.
#[derive(Clone)]
pub enum CallSiteRef {
    Constant(Arc<ConstantCallSite>),
    Volatile(Arc<VolatileCallSite>),
    Mutable(Arc<MutableCallSite>),
}

impl fmt::Debug for CallSiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavor = match self {
            CallSiteRef::Constant(_) => "ConstantCallSite",
            CallSiteRef::Volatile(_) => "VolatileCallSite",
            CallSiteRef::Mutable(_) => "MutableCallSite",
        };
        write!(f, "{flavor}{}@{:#x}", self.method_type(), self.identity())
    }
}

impl CallSiteRef {
    pub fn method_type(&self) -> &MethodType {
        match self {
            CallSiteRef::Constant(site) => &site.ty,
            CallSiteRef::Volatile(site) => &site.ty,
            CallSiteRef::Mutable(site) => &site.ty,
        }
    }

    pub fn target(&self) -> Result<MethodHandle> {
        match self {
            CallSiteRef::Constant(site) => site.target(),
            CallSiteRef::Volatile(site) => Ok(site.target()),
            CallSiteRef::Mutable(site) => Ok(site.target()),
        }
    }

    pub fn set_target(&self, target: &MethodHandle) -> Result<()> {
        match self {
            CallSiteRef::Constant(_) => Err(error::unsupported("constant call site target cannot change")),
            CallSiteRef::Volatile(site) => site.set_target(target),
            CallSiteRef::Mutable(site) => site.set_target(target),
        }
    }

    /// A handle that reads the current target on every call. A constant site's
    /// target is returned directly.
    pub fn dynamic_invoker(&self) -> Result<MethodHandle> {
        if let CallSiteRef::Constant(site) = self {
            return site.target();
        }
        MethodHandle::from_parts(
            self.method_type().clone(),
            HandleKind::DynamicInvoker,
            Payload::DynamicInvoker { site: self.clone() },
        )
    }

    pub fn ptr_eq(&self, other: &CallSiteRef) -> bool {
        self.identity() == other.identity()
    }

    pub fn identity(&self) -> usize {
        match self {
            CallSiteRef::Constant(site) => Arc::as_ptr(site) as usize,
            CallSiteRef::Volatile(site) => Arc::as_ptr(site) as usize,
            CallSiteRef::Mutable(site) => Arc::as_ptr(site) as usize,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::object(ObjRef::call_site(self.clone()))
    }
}

/// Makes plain writes to the given mutable sites visible to every thread. Only
/// mutable sites may be passed.
///
/// Targets live behind locks, so a single full fence covers every site.
pub fn sync_all(sites: &[CallSiteRef]) -> Result<()> {
    if let Some(other) = sites.iter().find(|s| !matches!(s, CallSiteRef::Mutable(_))) {
        return Err(error::illegal_argument(format!("syncAll takes mutable call sites, got {other:?}")));
    }
    fence(Ordering::SeqCst);
    debug!(target: "invoke::callsite", count = sites.len(), "syncAll");
    Ok(())
}
