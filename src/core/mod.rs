// Parsing primitives and the comparison core behind the public validator surface.
pub mod compare;
pub mod datetime;
pub mod duration;
pub mod error;
pub mod number;
