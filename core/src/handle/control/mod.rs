//! Control-flow combinators.

pub mod catch;
pub mod finally;
pub mod guard;
pub mod loops;

pub use catch::catch_exception;
pub use finally::try_finally;
pub use guard::guard_with_test;
pub use loops::{LoopClause, counted_loop, counted_loop_range, do_while_loop, iterated_loop, loop_, while_loop};

use crate::method_type::MethodType;

/// `prefix` is a leading run of `of`'s parameters.
pub(crate) fn is_parameter_prefix(prefix: &MethodType, of: &MethodType) -> bool {
    prefix.parameter_count() <= of.parameter_count()
        && prefix.parameters() == &of.parameters()[..prefix.parameter_count()]
}
