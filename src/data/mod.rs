//! Tagged measurement data printed by the instrumented binaries.

pub mod error;
pub mod record;
pub mod reduce;

pub use error::ExtractError;
pub use record::Origin;
pub use reduce::extract;
