//! The generic loop combinator and the while/do-while/counted forms built on it.
//!
//! A loop is a list of clauses. Each clause may declare an iteration variable
//! through the return type of its `init`/`step`; the variables of all clauses
//! form `V...`. The loop's own parameters `A...` feed every `init`, while `step`,
//! `pred` and `fini` see `(V..., A...)`. One iteration runs every clause in order:
//! `step` first, then `pred`; the first false predicate makes that clause's `fini`
//! produce the loop result.

use std::sync::Arc;

use anyhow::Result;

use crate::class::well_known;
use crate::error;
use crate::lookup::Lookup;
use crate::method_type::MethodType;
use crate::types::JType;
use crate::value::Value;

use crate::handle::combinators::{drop_arguments, filter_arguments, permute_arguments};
use crate::handle::constant::{constant, empty, identity, zero};
use crate::handle::support;
use crate::handle::{HandleKind, MethodHandle, Payload};

/// One loop clause as supplied by the caller. Absent handles get defaults.
#[derive(Clone, Default)]
pub struct LoopClause {
    pub init: Option<MethodHandle>,
    pub step: Option<MethodHandle>,
    pub pred: Option<MethodHandle>,
    pub fini: Option<MethodHandle>,
}

impl LoopClause {
    pub fn new(
        init: Option<&MethodHandle>,
        step: Option<&MethodHandle>,
        pred: Option<&MethodHandle>,
        fini: Option<&MethodHandle>,
    ) -> Self {
        Self {
            init: init.cloned(),
            step: step.cloned(),
            pred: pred.cloned(),
            fini: fini.cloned(),
        }
    }

    fn is_empty(&self) -> bool {
        self.init.is_none() && self.step.is_none() && self.pred.is_none() && self.fini.is_none()
    }

    fn non_init(&self) -> impl Iterator<Item = &MethodHandle> {
        [&self.step, &self.pred, &self.fini].into_iter().flatten()
    }
}

/// A clause after defaults were filled in and every handle was widened to the
/// full loop signature.
#[derive(Clone)]
pub(crate) struct Clause {
    pub(crate) init: MethodHandle,
    pub(crate) step: MethodHandle,
    pub(crate) pred: MethodHandle,
    pub(crate) fini: MethodHandle,
    /// Index of this clause's iteration variable in `V...`.
    pub(crate) var: Option<usize>,
}

impl Clause {
    pub(crate) fn handles(&self) -> [&MethodHandle; 4] {
        [&self.init, &self.step, &self.pred, &self.fini]
    }
}

fn loop_error(msg: impl Into<String>) -> anyhow::Error {
    error::illegal_argument(msg)
}

/// Builds a loop from `clauses`; clauses with no handles are ignored.
pub fn loop_(clauses: Vec<LoopClause>) -> Result<MethodHandle> {
    let clauses: Vec<LoopClause> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
    if clauses.is_empty() {
        return Err(loop_error("loop needs at least one non-empty clause"));
    }
    if clauses.iter().all(|c| c.pred.is_none()) {
        return Err(loop_error("loop needs at least one predicate"));
    }

    let mut var_types: Vec<JType> = Vec::new();
    let mut clause_vars = Vec::with_capacity(clauses.len());
    for (i, clause) in clauses.iter().enumerate() {
        let init_rtype = clause.init.as_ref().map(|h| h.method_type().return_type());
        let step_rtype = clause.step.as_ref().map(|h| h.method_type().return_type());
        if let (Some(a), Some(b)) = (init_rtype, step_rtype)
            && a != b
        {
            return Err(loop_error(format!("clause {i}: init returns {a} but step returns {b}")));
        }
        match init_rtype.or(step_rtype).filter(|t| !t.is_void()) {
            Some(t) => {
                clause_vars.push(Some((var_types.len(), t.clone())));
                var_types.push(t.clone());
            }
            None => clause_vars.push(None),
        }
        if let Some(pred) = &clause.pred
            && *pred.method_type().return_type() != JType::Boolean
        {
            return Err(loop_error(format!("clause {i}: predicate {} must return boolean", pred.method_type())));
        }
    }

    let mut finis = clauses.iter().filter_map(|c| c.fini.as_ref()).map(|h| h.method_type().return_type());
    let loop_rtype = finis.next().cloned().unwrap_or(JType::Void);
    if let Some(other) = finis.find(|t| **t != loop_rtype) {
        return Err(loop_error(format!("finalizers return both {loop_rtype} and {other}")));
    }

    let external = loop_parameters(&clauses, &var_types)?;
    let mut full = var_types.clone();
    full.extend(external.iter().cloned());

    let mut filled = Vec::with_capacity(clauses.len());
    for (clause, var) in clauses.into_iter().zip(clause_vars) {
        let var_type = var.as_ref().map(|(_, t)| t.clone()).unwrap_or(JType::Void);
        let init = match clause.init {
            Some(h) => h,
            None => zero(&var_type)?,
        };
        let step = match (clause.step, &var) {
            (Some(h), _) => h,
            (None, Some((index, t))) => {
                let id = drop_arguments(&identity(t)?, 0, &full[..*index])?;
                drop_arguments(&id, index + 1, &full[index + 1..])?
            }
            (None, None) => empty(&MethodType::method_type(JType::Void, full.clone()))?,
        };
        let pred = match clause.pred {
            Some(h) => h,
            None => drop_arguments(&constant(&JType::Boolean, Value::Boolean(true))?, 0, &full)?,
        };
        let fini = match clause.fini {
            Some(h) => h,
            None => empty(&MethodType::method_type(loop_rtype.clone(), full.clone()))?,
        };
        filled.push(Clause {
            init: widen(&init, &external)?,
            step: widen(&step, &full)?,
            pred: widen(&pred, &full)?,
            fini: widen(&fini, &full)?,
            var: var.map(|(index, _)| index),
        });
    }

    MethodHandle::from_parts(
        MethodType::new(loop_rtype, external)?,
        HandleKind::Loop,
        Payload::Loop {
            clauses: Arc::from(filled),
        },
    )
}

/// The loop parameters `A...`: the longest init parameter list, or the longest
/// suffix after `V...` of any other clause handle. Every init must take a prefix of
/// `A...` and every other handle a prefix of `(V..., A...)`.
fn loop_parameters(clauses: &[LoopClause], vars: &[JType]) -> Result<Vec<JType>> {
    let inits = clauses.iter().filter_map(|c| c.init.as_ref()).map(|h| h.method_type().parameters());
    let suffixes = clauses
        .iter()
        .flat_map(LoopClause::non_init)
        .map(|h| h.method_type().parameters())
        .filter(|p| p.len() > vars.len())
        .map(|p| &p[vars.len()..]);
    let external = inits
        .chain(suffixes)
        .max_by_key(|p| p.len())
        .map(<[JType]>::to_vec)
        .unwrap_or_default();

    let mut full = vars.to_vec();
    full.extend(external.iter().cloned());
    for clause in clauses {
        if let Some(init) = &clause.init
            && !is_prefix(init.method_type().parameters(), &external)
        {
            return Err(loop_error(format!(
                "init {} does not take a prefix of the loop parameters",
                init.method_type()
            )));
        }
        for h in clause.non_init() {
            if !is_prefix(h.method_type().parameters(), &full) {
                return Err(loop_error(format!(
                    "{} does not take a prefix of the loop variables and parameters",
                    h.method_type()
                )));
            }
        }
    }
    Ok(external)
}

fn is_prefix(params: &[JType], of: &[JType]) -> bool {
    params.len() <= of.len() && params == &of[..params.len()]
}

fn widen(handle: &MethodHandle, to: &[JType]) -> Result<MethodHandle> {
    let count = handle.method_type().parameter_count();
    drop_arguments(handle, count, &to[count..])
}

/// `while (pred(v, a...)) v = body(v, a...); return v;`
pub fn while_loop(init: Option<&MethodHandle>, pred: &MethodHandle, body: &MethodHandle) -> Result<MethodHandle> {
    let rtype = body.method_type().return_type();
    let fini = if rtype.is_void() { None } else { Some(identity(rtype)?) };
    loop_(vec![
        LoopClause::new(None, None, Some(pred), fini.as_ref()),
        LoopClause::new(init, Some(body), None, None),
    ])
}

/// `do v = body(v, a...); while (pred(v, a...)); return v;`
pub fn do_while_loop(init: Option<&MethodHandle>, body: &MethodHandle, pred: &MethodHandle) -> Result<MethodHandle> {
    let rtype = body.method_type().return_type();
    let fini = if rtype.is_void() { None } else { Some(identity(rtype)?) };
    loop_(vec![LoopClause::new(init, Some(body), Some(pred), fini.as_ref())])
}

/// Runs `body(v, i, a...)` for `i` in `0..iterations(a...)`.
pub fn counted_loop(iterations: &MethodHandle, init: Option<&MethodHandle>, body: &MethodHandle) -> Result<MethodHandle> {
    let start = empty(iterations.method_type())?;
    counted_loop_range(&start, iterations, init, body)
}

/// Runs `body(v, i, a...)` for `i` in `start(a...)..end(a...)`.
pub fn counted_loop_range(
    start: &MethodHandle,
    end: &MethodHandle,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<MethodHandle> {
    for h in [start, end] {
        if *h.method_type().return_type() != JType::Int {
            return Err(loop_error(format!("loop bound {} must return int", h.method_type())));
        }
    }
    if start.method_type().parameters() != end.method_type().parameters() {
        return Err(loop_error(format!(
            "loop bounds {} and {} take different parameters",
            start.method_type(),
            end.method_type()
        )));
    }
    let rtype = body.method_type().return_type().clone();
    let mut incr = support::counter_increment()?;
    let mut pred = support::counter_predicate()?;
    let mut fini = None;
    if !rtype.is_void() {
        incr = drop_arguments(&incr, 1, std::slice::from_ref(&rtype))?;
        pred = drop_arguments(&pred, 1, std::slice::from_ref(&rtype))?;
        fini = Some(drop_arguments(&identity(&rtype)?, 0, &[JType::Int])?);
    }
    let body = drop_arguments(body, 0, &[JType::Int])?;
    loop_(vec![
        LoopClause::new(Some(end), None, Some(&pred), fini.as_ref()),
        LoopClause::new(init, Some(&body), None, None),
        LoopClause::new(Some(start), Some(&incr), None, None),
    ])
}

/// `for (T t : iterator(a...)) v = body(v, t, a...); return v;`
///
/// `body` is `(V, T, A...)V`, or `(T, A...)void` with no loop variable. Without
/// an `iterator` handle the first loop parameter must be an `Iterable` and its
/// `iterator()` is used.
pub fn iterated_loop(
    iterator: Option<&MethodHandle>,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<MethodHandle> {
    let wk = well_known();
    let body_type = body.method_type();
    let rtype = body_type.return_type().clone();
    let params = body_type.parameters();
    let leading = if rtype.is_void() { 1 } else { 2 };
    if params.len() < leading {
        return Err(loop_error(format!("loop body {body_type} takes no element")));
    }
    if !rtype.is_void() && params[0] != rtype {
        return Err(loop_error(format!("loop body {body_type} must take its result type first")));
    }
    let element = params[leading - 1].clone();
    let external = &params[leading..];

    let lookup = Lookup::public_lookup();
    let iterator_type = JType::of(&wk.iterator);
    let iterator = match iterator {
        Some(h) => match h.method_type().return_type() {
            JType::Ref(c) if wk.iterator.is_assignable_from(c) => h.clone(),
            other => return Err(loop_error(format!("iterator handle returns {other}, not an Iterator"))),
        },
        None => {
            let from_iterable =
                lookup.find_virtual(&wk.iterable, "iterator", &MethodType::method_type(iterator_type.clone(), vec![]))?;
            match external.first() {
                None => from_iterable,
                Some(JType::Ref(c)) if wk.iterable.is_assignable_from(c) => {
                    let ty = from_iterable.method_type().change_parameter_type(0, JType::Ref(c.clone()))?;
                    from_iterable.as_type(&ty)?
                }
                Some(other) => return Err(loop_error(format!("first loop parameter {other} is not Iterable"))),
            }
        }
    };
    let iterator = iterator.as_type(&iterator.method_type().change_return_type(iterator_type.clone()))?;

    let has_next = lookup.find_virtual(&wk.iterator, "hasNext", &MethodType::method_type(JType::Boolean, vec![]))?;
    let next = lookup.find_virtual(&wk.iterator, "next", &MethodType::method_type(JType::object(), vec![]))?;
    let next = next.as_type(&MethodType::method_type(element, vec![iterator_type.clone()]))?;

    let (loop_body, fini) = if rtype.is_void() {
        (body.clone(), None)
    } else {
        let mut swapped = params.to_vec();
        swapped.swap(0, 1);
        let mut reorder: Vec<usize> = (0..params.len()).collect();
        reorder.swap(0, 1);
        let swapped = permute_arguments(body, &MethodType::method_type(rtype.clone(), swapped), &reorder)?;
        let fini = drop_arguments(&identity(&rtype)?, 0, &[iterator_type])?;
        (swapped, Some(fini))
    };
    let step = filter_arguments(&loop_body, 0, vec![Some(next)])?;
    loop_(vec![
        LoopClause::new(Some(&iterator), None, Some(&has_next), fini.as_ref()),
        LoopClause::new(init, Some(&step), None, None),
    ])
}

pub(crate) fn invoke(clauses: &[Clause], args: Vec<Value>) -> Result<Value> {
    let mut vars: Vec<Value> = Vec::new();
    for clause in clauses {
        let value = clause.init.invoke_basic(args.clone())?;
        if clause.var.is_some() {
            vars.push(value);
        }
    }
    let state = |vars: &[Value]| -> Vec<Value> { vars.iter().chain(args.iter()).cloned().collect() };
    loop {
        for clause in clauses {
            let value = clause.step.invoke_basic(state(&vars))?;
            if let Some(index) = clause.var {
                vars[index] = value;
            }
            let current = state(&vars);
            if !clause.pred.invoke_basic(current.clone())?.as_bool()? {
                return clause.fini.invoke_basic(current);
            }
        }
    }
}
