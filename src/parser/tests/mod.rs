//! Parser tests
//!
//! - expressions: operator precedence, members, calls, collections
//! - errors: positions and messages of rejected input

mod errors;
