// core.rs splits responsibilities into submodules for easier maintenance.
pub mod block;
pub mod chain;
pub mod challenge;
pub mod entry;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use challenge::*;
pub use entry::*;
pub use validation::*;
