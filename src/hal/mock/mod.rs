pub mod hardware;

pub use hardware::{SimulatedDevice, SimulatedHardware, SimulatedLayout};
