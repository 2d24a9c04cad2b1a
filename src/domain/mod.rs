// Domain layer: models and ports. Adapters implement the ports against the host.

pub mod model;
pub mod ports;
