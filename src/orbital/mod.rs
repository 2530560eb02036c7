pub mod elements;
pub mod kepler;
pub mod maneuvers;
pub mod node;
pub mod propagator;

pub use elements::{OrbitState, PrimaryBody};
pub use maneuvers::{
    change_apoapsis, change_inclination, change_periapsis, change_sma, circularize, hohmann,
    hohmann_transfer, vis_viva, HohmannTransfer,
};
pub use node::{Apsis, ManeuverNode, NodeId, OrbitNode};
pub use propagator::{coast, CoastState};
