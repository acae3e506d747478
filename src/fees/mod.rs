//! Fee Estimation Module
//!
//! Size-based fee model shared by planning and the chain registry.

mod estimator;

pub use estimator::*;
