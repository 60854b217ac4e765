// Domain layer: mapping models, records and ports. No I/O here.

pub mod mapping;
pub mod model;
pub mod ports;
