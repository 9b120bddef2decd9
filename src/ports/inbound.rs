//! Inbound ports. The presentation layer hooks into the application here.

use crate::domain::{LoadReport, MenuSnapshot};

/// Completion callback of a load sequence.
///
/// Called once per run, after the worker has been joined, on the task that
/// awaited `ModelLoader::run`.
pub trait LoadListener: Send + Sync {
    fn on_load_finished(&self, report: &LoadReport);
}

/// Observer of the application state held by `MenuModel`.
pub trait ModelObserver: Send + Sync {
    fn on_model_changed(&self, snapshot: &MenuSnapshot);
}
