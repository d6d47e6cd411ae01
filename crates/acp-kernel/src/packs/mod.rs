//! Built-in action packs. `meta` and `iam` ship with every kernel; `domain`
//! is the illustrative pack exercised by the conformance scenarios.

pub mod domain;
pub mod iam;
pub mod meta;
