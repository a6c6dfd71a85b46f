//! Element resolution by declarative selector.
//!
//! Turns a [`SelectorSpec`](webstress_core_types::SelectorSpec) into zero or
//! one element handle, with a bounded polling wait. One kind per step: a
//! failed resolution fails the step, the resolver never silently retries an
//! alternate kind.

pub mod errors;
pub mod resolver;
mod strategies;

pub use errors::LocatorError;
pub use resolver::resolve;

/// Attribute queried for `testid` selectors.
pub const TEST_ID_ATTR: &str = "data-testid";

/// Attribute queried for `section_product` selectors.
pub const PRODUCT_ID_ATTR: &str = "data-product-id";
