pub mod controller;
pub mod routes;
pub mod state;

pub use controller::{PageRotator, RotationConfig, RotationEvent, RotationSnapshot};
pub use routes::{Route, RouteTable, EXTRA_PATH};
pub use state::{RotationState, Transition};
