//! Thunk keys and the process-wide shape cache.
//!
//! A key is the handle's kind, its thunkable type (references widened to
//! `Object`, sub-int primitives widened to `int`), the thunkable types of its
//! children and the kind's structural integers. Handles with equal keys share one
//! [`DispatchDescriptor`]; child identities and inserted values stay runtime data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use crate::config;
use crate::handle::{HandleKind, MethodHandle, Payload};
use crate::method_type::MethodType;
use crate::types::JType;
use crate::util::sync::{read, write};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThunkKey {
    pub kind: HandleKind,
    pub thunkable_type: MethodType,
    pub children: Box<[MethodType]>,
    pub params: Box<[i64]>,
    /// Set for handle-specific ("custom") thunks: the owning handle's identity.
    pub unshareable: Option<usize>,
}

/// Where one argument of a child call comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArgSource {
    /// Outer arguments `start..end`, passed through in order.
    Slice { start: usize, end: usize },
    /// Runtime data of the handle: a bound receiver or an inserted value.
    Data(usize),
    /// The elements of the array in outer argument `index`.
    SpreadArray { index: usize, count: usize },
    /// A fresh array of outer arguments `start..start + count`.
    NewArray { start: usize, count: usize },
    /// The result of an earlier child call.
    ChildResult(usize),
    /// The throwable caught by a catch or finally node.
    Thrown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildCall {
    /// Ordinal of the child among the node's children; the invoked handle itself
    /// for invoker kinds, which read it from argument 0.
    pub child: usize,
    pub args: Vec<ArgSource>,
}

/// The argument plan a code generator must honor for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThunkTemplate {
    pub kind: HandleKind,
    pub arity: usize,
    pub calls: Vec<ChildCall>,
}

/// Shared dispatch code for one key.
#[derive(Debug)]
pub struct DispatchDescriptor {
    id: u64,
    key: ThunkKey,
    template: ThunkTemplate,
}

impl DispatchDescriptor {
    pub fn new(key: ThunkKey, template: ThunkTemplate) -> Self {
        Self {
            id: NEXT_DESCRIPTOR.fetch_add(1, Ordering::Relaxed),
            key,
            template,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &ThunkKey {
        &self.key
    }

    pub fn template(&self) -> &ThunkTemplate {
        &self.template
    }
}

static NEXT_DESCRIPTOR: AtomicU64 = AtomicU64::new(1);

/// The code-generation backend. It may be called concurrently for the same key;
/// only one result is kept.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, key: &ThunkKey, template: &ThunkTemplate) -> DispatchDescriptor;
}

/// Default backend: records the template without producing machine code.
pub struct TemplateRecorder;

impl CodeGenerator for TemplateRecorder {
    fn generate(&self, key: &ThunkKey, template: &ThunkTemplate) -> DispatchDescriptor {
        DispatchDescriptor::new(key.clone(), template.clone())
    }
}

pub struct ThunkTable {
    entries: DashMap<ThunkKey, Arc<DispatchDescriptor>>,
    generator: RwLock<Arc<dyn CodeGenerator>>,
}

static GLOBAL: Lazy<ThunkTable> = Lazy::new(ThunkTable::new);

impl Default for ThunkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ThunkTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generator: RwLock::new(Arc::new(TemplateRecorder)),
        }
    }

    pub fn global() -> &'static ThunkTable {
        &GLOBAL
    }

    /// The descriptor for `key`, generating it on first use. Generation runs
    /// outside the map lock; when two threads race, the first insert wins and the
    /// other result is dropped.
    ///
    /// Unshareable keys are generated every time and never stored: their
    /// descriptor belongs to the one handle that asked for it.
    pub fn get(&self, key: ThunkKey, template: impl FnOnce() -> ThunkTemplate) -> Arc<DispatchDescriptor> {
        if key.unshareable.is_some() {
            return self.generate(key, template);
        }
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }
        let generated = self.generate(key.clone(), template);
        match self.entries.entry(key) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(generated).clone(),
        }
    }

    fn generate(&self, key: ThunkKey, template: impl FnOnce() -> ThunkTemplate) -> Arc<DispatchDescriptor> {
        let generator = read(&self.generator).clone();
        let generated = Arc::new(generator.generate(&key, &template()));
        debug!(
            target: "invoke::thunk",
            kind = %generated.key.kind,
            ty = %generated.key.thunkable_type,
            custom = generated.key.unshareable.is_some(),
            id = generated.id,
            "generated thunk"
        );
        generated
    }

    pub fn contains(&self, key: &ThunkKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn install_code_generator(&self, generator: Arc<dyn CodeGenerator>) {
        *write(&self.generator) = generator;
    }
}

/// Installs the backend used for every thunk generated from now on.
pub fn install_code_generator(generator: Arc<dyn CodeGenerator>) {
    ThunkTable::global().install_code_generator(generator);
}

fn thunkable(ty: &JType) -> JType {
    match ty {
        JType::Ref(_) => JType::object(),
        t if t.is_sub_int() => JType::Int,
        t => t.clone(),
    }
}

/// `ty` with references erased to `Object` and sub-int primitives widened to `int`.
pub fn thunkable_type(ty: &MethodType) -> MethodType {
    MethodType::method_type(
        thunkable(ty.return_type()),
        ty.parameters().iter().map(thunkable).collect(),
    )
}

fn type_code(ty: &JType) -> i64 {
    match ty {
        JType::Ref(_) => i64::from(b'L'),
        t => t.descriptor().bytes().next().map_or(0, i64::from),
    }
}

pub(crate) fn children(handle: &MethodHandle) -> Vec<&MethodHandle> {
    match handle.payload() {
        Payload::Bound { next, .. }
        | Payload::Convert { next }
        | Payload::Insert { next, .. }
        | Payload::Permute { next, .. }
        | Payload::Collect { next, .. }
        | Payload::Spread { next, .. }
        | Payload::VarargsCollector { next, .. } => vec![next],
        Payload::FilterArguments { next, filters, .. } => {
            filters.iter().flatten().chain(std::iter::once(next)).collect()
        }
        Payload::FilterReturn { next, filter } => vec![next, filter],
        Payload::Fold { next, combiner, .. } => vec![combiner, next],
        Payload::GuardWithTest {
            guard,
            true_target,
            false_target,
        } => vec![guard, true_target, false_target],
        Payload::Catch { try_target, handler, .. } => vec![try_target, handler],
        Payload::Finally { try_target, cleanup } => vec![try_target, cleanup],
        Payload::Loop { clauses } => clauses.iter().flat_map(|c| c.handles()).collect(),
        Payload::Primitive(_)
        | Payload::Constant(_)
        | Payload::Invoker { .. }
        | Payload::DynamicInvoker { .. }
        | Payload::VarHandleInvoker { .. } => Vec::new(),
    }
}

pub(crate) fn structural_params(handle: &MethodHandle) -> Vec<i64> {
    let n = |v: usize| v as i64;
    match handle.payload() {
        Payload::Primitive(target) => vec![i64::from(target.ref_kind() as u8)],
        Payload::Insert { position, values, .. } => {
            let mut p = vec![n(*position), n(values.len())];
            p.extend(values.iter().map(|v| v.primitive_type().map_or(i64::from(b'L'), |t| type_code(&t))));
            p
        }
        Payload::Permute { reorder, .. } => reorder.iter().copied().map(n).collect(),
        Payload::Collect {
            position,
            count,
            component,
            ..
        } => vec![n(*position), n(*count), type_code(component)],
        Payload::Spread {
            position,
            count,
            array_class,
            ..
        } => {
            let component = array_class.component_type().map_or(0, type_code);
            vec![n(*position), n(*count), component]
        }
        Payload::FilterArguments { start, filters, .. } => std::iter::once(n(*start))
            .chain(filters.iter().map(|f| i64::from(f.is_some())))
            .collect(),
        Payload::Fold { position, indices, .. } => {
            std::iter::once(n(*position)).chain(indices.iter().copied().map(n)).collect()
        }
        Payload::Loop { clauses } => std::iter::once(n(clauses.len()))
            .chain(clauses.iter().map(|c| c.var.map_or(-1, n)))
            .collect(),
        Payload::VarargsCollector { array_class, .. } => vec![array_class.component_type().map_or(0, type_code)],
        Payload::Invoker { next_type } => vec![n(next_type.parameter_count())],
        Payload::VarHandleInvoker { mode, .. } => vec![*mode as i64],
        _ => Vec::new(),
    }
}

/// The cache key of `handle`; `unshareable` keys are private to the handle.
pub fn key_for(handle: &MethodHandle, unshareable: bool) -> ThunkKey {
    let private = unshareable || !config::share_thunks();
    ThunkKey {
        kind: handle.kind(),
        // AsType and ExplicitCast nodes with different reference cast targets erase
        // to the same key; the conversion reads its target type at run time.
        thunkable_type: thunkable_type(handle.method_type()),
        children: children(handle)
            .into_iter()
            .map(|c| thunkable_type(c.method_type()))
            .collect(),
        params: structural_params(handle).into_boxed_slice(),
        unshareable: private.then(|| handle.identity()),
    }
}

struct Plan(Vec<ArgSource>);

impl Plan {
    fn new() -> Self {
        Plan(Vec::new())
    }

    fn slice(mut self, start: usize, end: usize) -> Self {
        if start < end {
            if let Some(ArgSource::Slice { end: last, .. }) = self.0.last_mut()
                && *last == start
            {
                *last = end;
                return self;
            }
            self.0.push(ArgSource::Slice { start, end });
        }
        self
    }

    fn push(mut self, source: ArgSource) -> Self {
        self.0.push(source);
        self
    }

    fn call(self, child: usize) -> ChildCall {
        ChildCall { child, args: self.0 }
    }
}

/// The argument plan of `handle`'s node.
pub fn template_for(handle: &MethodHandle) -> ThunkTemplate {
    let arity = handle.method_type().parameter_count();
    let all = || Plan::new().slice(0, arity);
    let calls = match handle.payload() {
        Payload::Primitive(_) | Payload::Constant(_) | Payload::Loop { .. } => Vec::new(),
        Payload::Bound { .. } => vec![Plan::new().push(ArgSource::Data(0)).slice(0, arity).call(0)],
        Payload::Convert { .. } | Payload::VarargsCollector { .. } | Payload::DynamicInvoker { .. } => {
            vec![all().call(0)]
        }
        Payload::Insert { position, values, .. } => {
            let mut plan = Plan::new().slice(0, *position);
            for i in 0..values.len() {
                plan = plan.push(ArgSource::Data(i));
            }
            vec![plan.slice(*position, arity).call(0)]
        }
        Payload::Permute { reorder, .. } => {
            let plan = reorder.iter().fold(Plan::new(), |plan, &i| plan.slice(i, i + 1));
            vec![plan.call(0)]
        }
        Payload::Collect { position, count, .. } => vec![
            Plan::new()
                .slice(0, *position)
                .push(ArgSource::NewArray {
                    start: *position,
                    count: *count,
                })
                .slice(position + count, arity)
                .call(0),
        ],
        Payload::Spread { position, count, .. } => vec![
            Plan::new()
                .slice(0, *position)
                .push(ArgSource::SpreadArray {
                    index: *position,
                    count: *count,
                })
                .slice(position + 1, arity)
                .call(0),
        ],
        Payload::FilterArguments { start, filters, .. } => {
            let mut calls = Vec::new();
            let mut next = Plan::new().slice(0, *start);
            for (i, filter) in filters.iter().enumerate() {
                let slot = start + i;
                if filter.is_some() {
                    calls.push(Plan::new().slice(slot, slot + 1).call(calls.len()));
                    next = next.push(ArgSource::ChildResult(calls.len() - 1));
                } else {
                    next = next.slice(slot, slot + 1);
                }
            }
            let filtered = calls.len();
            calls.push(next.slice(start + filters.len(), arity).call(filtered));
            calls
        }
        Payload::FilterReturn { next, .. } => {
            let filter_args = if next.method_type().return_type().is_void() {
                Plan::new()
            } else {
                Plan::new().push(ArgSource::ChildResult(0))
            };
            vec![all().call(0), filter_args.call(1)]
        }
        Payload::Fold {
            position,
            combiner,
            indices,
            ..
        } => {
            let folded = indices.iter().fold(Plan::new(), |plan, &i| plan.slice(i, i + 1));
            let mut next = Plan::new().slice(0, *position);
            if !combiner.method_type().return_type().is_void() {
                next = next.push(ArgSource::ChildResult(0));
            }
            vec![folded.call(0), next.slice(*position, arity).call(1)]
        }
        Payload::GuardWithTest { guard, .. } => vec![
            Plan::new().slice(0, guard.method_type().parameter_count()).call(0),
            all().call(1),
            all().call(2),
        ],
        Payload::Catch { handler, .. } => {
            let prefix = handler.method_type().parameter_count().saturating_sub(1);
            vec![all().call(0), Plan::new().push(ArgSource::Thrown).slice(0, prefix).call(1)]
        }
        Payload::Finally { try_target, cleanup } => {
            let void = try_target.method_type().return_type().is_void();
            let leading = if void { 1 } else { 2 };
            let prefix = cleanup.method_type().parameter_count().saturating_sub(leading);
            let mut plan = Plan::new().push(ArgSource::Thrown);
            if !void {
                plan = plan.push(ArgSource::ChildResult(0));
            }
            vec![all().call(0), plan.slice(0, prefix).call(1)]
        }
        Payload::Invoker { .. } | Payload::VarHandleInvoker { .. } => vec![Plan::new().slice(1, arity).call(0)],
    };
    ThunkTemplate {
        kind: handle.kind(),
        arity,
        calls,
    }
}
