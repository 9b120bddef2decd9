//! Application use cases. Orchestrate domain logic via ports.

pub mod menu_model;
pub mod model_loader;
pub mod staleness;

pub use menu_model::{MenuModel, SubscriptionId};
pub use model_loader::ModelLoader;
pub use staleness::StalenessChecker;
