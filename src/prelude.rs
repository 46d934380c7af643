//! Commonly used imports.
#[allow(unused_imports)]
pub use log::{debug, error, info, trace, warn};
