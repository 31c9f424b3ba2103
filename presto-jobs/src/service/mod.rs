//! Service layer
//!
//! The collaborators the job engine depends on but does not implement:
//! rendering, print code resolution and direct delivery. Each is a trait so
//! deployments (and tests) can plug in their own implementation; a
//! standard implementation ships for each.

mod delivery;
mod renderer;
mod resolver;

// Re-export traits
pub use delivery::DeliverySink;
pub use renderer::{RenderRequest, Renderer};
pub use resolver::{ReportResolver, ResolvedReport};

// Re-export implementations
pub use delivery::{NoDelivery, SpoolDelivery};
pub use renderer::TextRenderer;
pub use resolver::{CatalogEntry, CatalogResolver};
