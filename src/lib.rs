pub mod config;
pub mod logger;
pub mod post;
pub mod post_list;
pub mod content;
pub mod loader;
pub mod validation;
pub mod cross_links;
pub mod report;
pub mod text_utils;
mod test_data;

pub use cross_links::{resolve_cross_links, CrossLinks};
pub use loader::{load_all, load_all_concurrent, Cancellation, LoadOptions, LoadOutcome};
pub use post::{FrontMatterField, KnownField, Post, PostPath};
pub use report::{Report, ReportFormat};
pub use validation::{validate, IssueKind, Severity, ValidationError};
