pub mod logging;
pub mod math;
pub mod palette;
pub mod simulation;
pub mod timing;
