/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - canonical market, ticker and balance types
[UPDATE]: When API schema changes or new types added
*/

pub mod enums;
pub mod models;

pub use enums::*;
pub use models::*;
