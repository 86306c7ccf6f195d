pub mod error;
pub mod loader;
pub mod result;

pub use error::LoadError;
pub use loader::{Loader, ProgressCallback};
pub use result::LoadResult;
