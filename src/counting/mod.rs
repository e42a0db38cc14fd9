pub mod audit;
pub mod capacity;
pub mod capture;
pub mod reconciler;
pub mod registry;
pub mod signage;

pub use capacity::{CapacityAdjuster, CapacityOutcome, CapacityStep};
pub use capture::{Capture, Direction};
pub use reconciler::{ReconcileReport, ReconcileStatus, Reconciler};
pub use registry::{CameraRegistry, Registries, ZoneRegistry};
pub use signage::{SignNotice, SignagePublisher};
