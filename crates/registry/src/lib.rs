//! # Registry
//!
//! Target observer registry: thread-safe collection of trackable-target
//! registrations by category, with bulk status queries against the engine's
//! latest state.
//!
//! ## Usage Example
//!
//! ```ignore
//! use registry::{ObserverRegistry, TargetQuery};
//!
//! let registry = Arc::new(ObserverRegistry::new(bridge));
//! registry.load_database(TargetCategory::Planar, Path::new("targets/planar.xml"))?;
//! registry.create_observer(TargetCategory::Planar, "Logo", None)?;
//!
//! let query = TargetQuery::new(Arc::clone(&registry), blueprint.transform);
//! for observation in query.get_observations(TargetCategory::Planar, 10)? {
//!     println!("{} {:?}", observation.target_name, observation.status);
//! }
//! ```

mod error;
mod query;
mod registry;

pub use error::{RegistryError, Result};
pub use query::TargetQuery;
pub use registry::ObserverRegistry;
