pub mod prefix;
pub mod rewrite;

pub use prefix::{run_prefix, PrefixOptions};
pub use rewrite::{run_import_rewrite, RewriteOptions};
