#[path = "handlers.rs"]
pub mod handlers;

// Re-export the testable helpers
pub use handlers::{
    build_context, collect_urls, describe_host, describe_translation, load_config,
    load_urls_from_file, write_default_config,
};
