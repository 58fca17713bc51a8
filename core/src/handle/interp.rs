//! Reference dispatch: executes one node with arguments already shaped to its type.

use anyhow::Result;

use crate::value::Value;

use super::combinators::{collect, filter, fold, insert, permute, spread};
use super::control::{catch, finally, guard, loops};
use super::{MethodHandle, Payload, adapt, invokers, primitive};

pub(super) fn dispatch(handle: &MethodHandle, args: Vec<Value>) -> Result<Value> {
    match handle.payload() {
        Payload::Primitive(target) => primitive::invoke(target, args),
        Payload::Bound { next, receiver } => adapt::invoke_bound(next, receiver, args),
        Payload::Constant(value) => Ok(value.clone()),
        Payload::Convert { next } => adapt::invoke_convert(handle, next, args),
        Payload::Insert { next, position, values } => insert::invoke(next, *position, values, args),
        Payload::Permute { next, reorder } => permute::invoke(next, reorder, args),
        Payload::Collect {
            next,
            position,
            count,
            component,
        } => collect::invoke(next, *position, *count, component, args),
        Payload::Spread {
            next,
            position,
            count,
            array_class,
        } => spread::invoke(next, *position, *count, array_class, args),
        Payload::FilterArguments { next, start, filters } => filter::invoke_arguments(next, *start, filters, args),
        Payload::FilterReturn { next, filter } => filter::invoke_return(next, filter, args),
        Payload::Fold {
            next,
            position,
            combiner,
            indices,
        } => fold::invoke(next, *position, combiner, indices, args),
        Payload::GuardWithTest {
            guard,
            true_target,
            false_target,
        } => guard::invoke(guard, true_target, false_target, args),
        Payload::Catch {
            try_target,
            handler,
            exception,
        } => catch::invoke(try_target, handler, exception, args),
        Payload::Finally { try_target, cleanup } => finally::invoke(try_target, cleanup, args),
        Payload::Loop { clauses } => loops::invoke(clauses, args),
        // exact invocation of the collector itself passes the array through
        Payload::VarargsCollector { next, .. } => next.invoke_basic(args),
        Payload::Invoker { next_type } => invokers::invoke_handle(handle, next_type, args),
        Payload::DynamicInvoker { site } => invokers::invoke_site(handle, site, args),
        Payload::VarHandleInvoker { mode, mode_type } => invokers::invoke_var_handle(handle, *mode, mode_type, args),
    }
}
