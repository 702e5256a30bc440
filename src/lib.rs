mod config;
mod error;
mod network;
mod optimizer;
mod prepare;
mod results;
mod topology;
mod unit;

pub mod dataset;
pub mod debug;
pub mod math;


pub use config::*;
pub use error::*;
pub use network::*;
pub use optimizer::*;
pub use prepare::*;
pub use results::*;
pub use topology::*;
pub use unit::*;
