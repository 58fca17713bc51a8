//! Structural equivalence of handle graphs.
//!
//! Two graphs are equivalent when a lock-step walk finds the same kind and type at
//! every node pair, equal structural parameters, and equal user-supplied values
//! (compared by value). Mutable call sites use this to keep dispatch assumptions
//! across target changes that do not alter behavior.

use std::collections::VecDeque;

use crate::handle::{MethodHandle, Payload};
use crate::util::fast_map::{VisitedPairs, fast_hash_set_new};
use crate::value::Value;

/// Receives the per-node facts of a lock-step comparison.
pub trait Comparator {
    /// A structural parameter (position, count, vector, class) matched or not.
    fn compare_structural(&mut self, same: bool);

    /// A caller-supplied value such as a bound receiver or an inserted constant.
    fn compare_user_supplied(&mut self, left: &Value, right: &Value);

    /// Child handles to be compared in turn.
    fn compare_child(&mut self, left: &MethodHandle, right: &MethodHandle);
}

/// Breadth-first comparator with a visited set over node-address pairs. Shared
/// subgraphs are compared once, and a cyclic graph still terminates.
pub struct StructuralComparator {
    pending: VecDeque<(MethodHandle, MethodHandle)>,
    visited: VisitedPairs,
    equal: bool,
}

impl Default for StructuralComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralComparator {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            visited: fast_hash_set_new(),
            equal: true,
        }
    }

    /// One-shot comparison of two graphs.
    pub fn equivalent(left: &MethodHandle, right: &MethodHandle) -> bool {
        Self::new().compare(left, right)
    }

    pub fn compare(&mut self, left: &MethodHandle, right: &MethodHandle) -> bool {
        self.pending.clear();
        self.visited.clear();
        self.equal = true;
        self.pending.push_back((left.clone(), right.clone()));
        while let Some((l, r)) = self.pending.pop_front() {
            if l.ptr_eq(&r) || !self.visited.insert((l.identity(), r.identity())) {
                continue;
            }
            if l.kind() != r.kind() || l.method_type() != r.method_type() {
                return false;
            }
            l.compare_with(&r, self);
            if !self.equal {
                return false;
            }
        }
        true
    }
}

impl Comparator for StructuralComparator {
    fn compare_structural(&mut self, same: bool) {
        self.equal &= same;
    }

    fn compare_user_supplied(&mut self, left: &Value, right: &Value) {
        self.equal &= left.same_value(right);
    }

    fn compare_child(&mut self, left: &MethodHandle, right: &MethodHandle) {
        self.pending.push_back((left.clone(), right.clone()));
    }
}

impl MethodHandle {
    /// Reports this node's structural parameters and children against `other`,
    /// which the caller guarantees has the same kind and type.
    pub fn compare_with(&self, other: &MethodHandle, c: &mut dyn Comparator) {
        match (self.payload(), other.payload()) {
            (Payload::Primitive(a), Payload::Primitive(b)) => {
                c.compare_structural(
                    a.ref_kind() == b.ref_kind()
                        && a.defining_class() == b.defining_class()
                        && a.name() == b.name()
                        && a.descriptor() == b.descriptor()
                        && a.special_caller() == b.special_caller(),
                );
            }
            (Payload::Bound { next: n1, receiver: r1 }, Payload::Bound { next: n2, receiver: r2 }) => {
                c.compare_user_supplied(r1, r2);
                c.compare_child(n1, n2);
            }
            (Payload::Constant(a), Payload::Constant(b)) => c.compare_user_supplied(a, b),
            (Payload::Convert { next: n1 }, Payload::Convert { next: n2 }) => c.compare_child(n1, n2),
            (
                Payload::Insert {
                    next: n1,
                    position: p1,
                    values: v1,
                },
                Payload::Insert {
                    next: n2,
                    position: p2,
                    values: v2,
                },
            ) => {
                c.compare_structural(p1 == p2 && v1.len() == v2.len());
                for (a, b) in v1.iter().zip(v2.iter()) {
                    c.compare_user_supplied(a, b);
                }
                c.compare_child(n1, n2);
            }
            (Payload::Permute { next: n1, reorder: r1 }, Payload::Permute { next: n2, reorder: r2 }) => {
                c.compare_structural(r1 == r2);
                c.compare_child(n1, n2);
            }
            (
                Payload::Collect {
                    next: n1,
                    position: p1,
                    count: k1,
                    component: t1,
                },
                Payload::Collect {
                    next: n2,
                    position: p2,
                    count: k2,
                    component: t2,
                },
            ) => {
                c.compare_structural(p1 == p2 && k1 == k2 && t1 == t2);
                c.compare_child(n1, n2);
            }
            (
                Payload::Spread {
                    next: n1,
                    position: p1,
                    count: k1,
                    array_class: a1,
                },
                Payload::Spread {
                    next: n2,
                    position: p2,
                    count: k2,
                    array_class: a2,
                },
            ) => {
                c.compare_structural(p1 == p2 && k1 == k2 && a1 == a2);
                c.compare_child(n1, n2);
            }
            (
                Payload::FilterArguments {
                    next: n1,
                    start: s1,
                    filters: f1,
                },
                Payload::FilterArguments {
                    next: n2,
                    start: s2,
                    filters: f2,
                },
            ) => {
                c.compare_structural(s1 == s2 && f1.len() == f2.len());
                for (a, b) in f1.iter().zip(f2.iter()) {
                    match (a, b) {
                        (Some(a), Some(b)) => c.compare_child(a, b),
                        (None, None) => {}
                        _ => c.compare_structural(false),
                    }
                }
                c.compare_child(n1, n2);
            }
            (Payload::FilterReturn { next: n1, filter: f1 }, Payload::FilterReturn { next: n2, filter: f2 }) => {
                c.compare_child(n1, n2);
                c.compare_child(f1, f2);
            }
            (
                Payload::Fold {
                    next: n1,
                    position: p1,
                    combiner: c1,
                    indices: i1,
                },
                Payload::Fold {
                    next: n2,
                    position: p2,
                    combiner: c2,
                    indices: i2,
                },
            ) => {
                c.compare_structural(p1 == p2 && i1 == i2);
                c.compare_child(c1, c2);
                c.compare_child(n1, n2);
            }
            (
                Payload::GuardWithTest {
                    guard: g1,
                    true_target: t1,
                    false_target: f1,
                },
                Payload::GuardWithTest {
                    guard: g2,
                    true_target: t2,
                    false_target: f2,
                },
            ) => {
                c.compare_child(g1, g2);
                c.compare_child(t1, t2);
                c.compare_child(f1, f2);
            }
            (
                Payload::Catch {
                    try_target: t1,
                    handler: h1,
                    exception: e1,
                },
                Payload::Catch {
                    try_target: t2,
                    handler: h2,
                    exception: e2,
                },
            ) => {
                c.compare_structural(e1 == e2);
                c.compare_child(t1, t2);
                c.compare_child(h1, h2);
            }
            (
                Payload::Finally {
                    try_target: t1,
                    cleanup: f1,
                },
                Payload::Finally {
                    try_target: t2,
                    cleanup: f2,
                },
            ) => {
                c.compare_child(t1, t2);
                c.compare_child(f1, f2);
            }
            (Payload::Loop { clauses: c1 }, Payload::Loop { clauses: c2 }) => {
                c.compare_structural(c1.len() == c2.len());
                for (a, b) in c1.iter().zip(c2.iter()) {
                    c.compare_structural(a.var == b.var);
                    for (x, y) in a.handles().into_iter().zip(b.handles()) {
                        c.compare_child(x, y);
                    }
                }
            }
            (
                Payload::VarargsCollector {
                    next: n1,
                    array_class: a1,
                },
                Payload::VarargsCollector {
                    next: n2,
                    array_class: a2,
                },
            ) => {
                c.compare_structural(a1 == a2);
                c.compare_child(n1, n2);
            }
            (Payload::Invoker { next_type: t1 }, Payload::Invoker { next_type: t2 }) => c.compare_structural(t1 == t2),
            (Payload::DynamicInvoker { site: s1 }, Payload::DynamicInvoker { site: s2 }) => {
                c.compare_structural(s1.ptr_eq(s2));
            }
            (
                Payload::VarHandleInvoker {
                    mode: m1,
                    mode_type: t1,
                },
                Payload::VarHandleInvoker {
                    mode: m2,
                    mode_type: t2,
                },
            ) => c.compare_structural(m1 == m2 && t1 == t2),
            _ => c.compare_structural(false),
        }
    }
}
