//! Reader, object-graph model, and writer for `project.pbxproj` documents.

pub mod parser;
pub mod project;
pub mod value;
pub mod writer;

pub use parser::ParseError;
pub use project::{BuildPhaseKind, ObjectId, OpenError, Project};
pub use value::{Dict, Value};
