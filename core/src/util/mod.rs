pub mod fast_map;
pub(crate) mod sync;
