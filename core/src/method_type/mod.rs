//! Interned method types.
//!
//! Structurally equal types share one allocation, so equality and hashing are by
//! pointer. The intern table holds weak values and is swept when it grows.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use anyhow::Result;
use dashmap::{DashMap, mapref::entry::Entry};
use once_cell::sync::Lazy;

use crate::error;
use crate::types::JType;

pub struct TypeData {
    rtype: JType,
    ptypes: Box<[JType]>,
    arg_slots: usize,
}

#[derive(Clone)]
pub struct MethodType(Arc<TypeData>);

type InternKey = (JType, Box<[JType]>);

static INTERNED: Lazy<DashMap<InternKey, Weak<TypeData>>> = Lazy::new(DashMap::new);
static INSERTS_SINCE_SWEEP: AtomicUsize = AtomicUsize::new(0);
const SWEEP_EVERY: usize = 512;

fn sweep() {
    INTERNED.retain(|_, data| data.strong_count() > 0);
}

impl MethodType {
    /// Builds (or finds) the canonical instance. Void parameters are rejected.
    pub fn new(rtype: JType, ptypes: Vec<JType>) -> Result<MethodType> {
        if let Some(pos) = ptypes.iter().position(JType::is_void) {
            return Err(error::illegal_argument(format!("parameter {pos} cannot be void")));
        }
        Ok(Self::intern(rtype, ptypes))
    }

    /// Infallible form of [`MethodType::new`] for types whose parameters are known to
    /// be non-void.
    pub fn method_type(rtype: JType, ptypes: Vec<JType>) -> MethodType {
        debug_assert!(ptypes.iter().all(|p| !p.is_void()));
        Self::intern(rtype, ptypes)
    }

    /// `(Object, ..., Object)Object` with `n` parameters.
    pub fn generic(n: usize) -> MethodType {
        Self::intern(JType::object(), vec![JType::object(); n])
    }

    fn intern(rtype: JType, ptypes: Vec<JType>) -> MethodType {
        let key: InternKey = (rtype, ptypes.into_boxed_slice());
        if let Some(existing) = INTERNED.get(&key).and_then(|w| w.upgrade()) {
            return MethodType(existing);
        }
        if INSERTS_SINCE_SWEEP.fetch_add(1, Ordering::Relaxed) >= SWEEP_EVERY {
            INSERTS_SINCE_SWEEP.store(0, Ordering::Relaxed);
            sweep();
        }
        let fresh = || {
            let arg_slots = key.1.iter().map(JType::slot_count).sum();
            Arc::new(TypeData {
                rtype: key.0.clone(),
                ptypes: key.1.clone(),
                arg_slots,
            })
        };
        match INTERNED.entry(key.clone()) {
            Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
                Some(existing) => MethodType(existing),
                None => {
                    let data = fresh();
                    occupied.insert(Arc::downgrade(&data));
                    MethodType(data)
                }
            },
            Entry::Vacant(slot) => {
                let data = fresh();
                slot.insert(Arc::downgrade(&data));
                MethodType(data)
            }
        }
    }

    #[inline]
    pub fn return_type(&self) -> &JType {
        &self.0.rtype
    }

    #[inline]
    pub fn parameters(&self) -> &[JType] {
        &self.0.ptypes
    }

    #[inline]
    pub fn parameter_count(&self) -> usize {
        self.0.ptypes.len()
    }

    #[inline]
    pub fn parameter_type(&self, index: usize) -> Option<&JType> {
        self.0.ptypes.get(index)
    }

    #[inline]
    pub fn last_parameter_type(&self) -> Option<&JType> {
        self.0.ptypes.last()
    }

    /// Argument slots consumed by the parameters (long/double count twice).
    #[inline]
    pub fn arg_slots(&self) -> usize {
        self.0.arg_slots
    }

    pub fn has_primitives(&self) -> bool {
        self.0.rtype.is_primitive() || self.0.ptypes.iter().any(JType::is_primitive)
    }

    #[inline]
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn change_return_type(&self, rtype: JType) -> MethodType {
        if rtype == self.0.rtype {
            return self.clone();
        }
        Self::intern(rtype, self.0.ptypes.to_vec())
    }

    pub fn change_parameter_type(&self, index: usize, ty: JType) -> Result<MethodType> {
        if index >= self.parameter_count() {
            return Err(error::illegal_argument(format!(
                "parameter index {index} out of range for {self}"
            )));
        }
        if ty.is_void() {
            return Err(error::illegal_argument("parameter cannot be void"));
        }
        let mut ptypes = self.0.ptypes.to_vec();
        ptypes[index] = ty;
        Ok(Self::intern(self.0.rtype.clone(), ptypes))
    }

    /// Removes parameters `[start, end)`.
    pub fn drop_parameter_types(&self, start: usize, end: usize) -> Result<MethodType> {
        if start > end || end > self.parameter_count() {
            return Err(error::illegal_argument(format!(
                "bad parameter range [{start}, {end}) for {self}"
            )));
        }
        let mut ptypes = self.0.ptypes.to_vec();
        ptypes.drain(start..end);
        Ok(Self::intern(self.0.rtype.clone(), ptypes))
    }

    pub fn insert_parameter_types(&self, index: usize, types: &[JType]) -> Result<MethodType> {
        if index > self.parameter_count() {
            return Err(error::illegal_argument(format!(
                "insertion point {index} out of range for {self}"
            )));
        }
        if types.iter().any(JType::is_void) {
            return Err(error::illegal_argument("parameter cannot be void"));
        }
        let mut ptypes = self.0.ptypes.to_vec();
        ptypes.splice(index..index, types.iter().cloned());
        Ok(Self::intern(self.0.rtype.clone(), ptypes))
    }

    pub fn append_parameter_types(&self, types: &[JType]) -> Result<MethodType> {
        self.insert_parameter_types(self.parameter_count(), types)
    }

    /// Every reference type becomes `Object`; primitives are kept.
    pub fn erase(&self) -> MethodType {
        let erase = |t: &JType| if t.is_reference() { JType::object() } else { t.clone() };
        Self::intern(erase(&self.0.rtype), self.0.ptypes.iter().map(erase).collect())
    }

    /// Every primitive becomes its wrapper; a void return stays void.
    pub fn wrap(&self) -> MethodType {
        let rtype = if self.0.rtype.is_void() { JType::Void } else { self.0.rtype.wrapped() };
        Self::intern(rtype, self.0.ptypes.iter().map(JType::wrapped).collect())
    }

    /// Every wrapper reference becomes its primitive.
    pub fn unwrap(&self) -> MethodType {
        let unwrap = |t: &JType| t.unwrapped().unwrap_or_else(|| t.clone());
        Self::intern(unwrap(&self.0.rtype), self.0.ptypes.iter().map(unwrap).collect())
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for p in self.parameters() {
            out.push_str(&p.descriptor());
        }
        out.push(')');
        out.push_str(&self.0.rtype.descriptor());
        out
    }
}

impl PartialEq for MethodType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MethodType {}

impl Hash for MethodType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr_id().hash(state);
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "){}", self.return_type())
    }
}

impl fmt::Debug for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
