// Domain layer: permit records, filter results and the ports the pipeline talks through.

pub mod model;
pub mod ports;
