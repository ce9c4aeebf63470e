//! Property-based tests

#[path = "properties/directives.rs"]
mod directives;
#[path = "properties/path_handling.rs"]
mod path_handling;
