// Domain layer: parameters, units, data handles, wavefront model and ports.

pub mod data;
pub mod parameters;
pub mod ports;
pub mod units;
pub mod wavefront;
