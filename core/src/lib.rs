//! Method-handle composition and dispatch: typed function references, the
//! combinators that adapt them, call sites that rebind them, and the shape cache
//! that lets structurally equal handle graphs share dispatch code.

pub mod call_site;
pub mod class;
pub mod compare;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod handle;
pub mod lookup;
pub mod method_type;
pub mod thunk;
pub mod trace;
pub mod types;
pub mod util;
pub mod value;
pub mod var_handle;

pub use call_site::{CallSiteRef, ConstantCallSite, MutableCallSite, VolatileCallSite};
pub use handle::{HandleKind, MethodHandle};
pub use lookup::Lookup;
pub use method_type::MethodType;
pub use types::JType;
pub use value::Value;
