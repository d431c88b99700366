// Domain layer: launch outcomes and the seams (launcher, operator prompt, port check).

pub mod model;
pub mod ports;
