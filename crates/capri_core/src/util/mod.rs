//! Small shared helpers with no storage or domain knowledge.

pub mod strings;
