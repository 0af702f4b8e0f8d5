pub mod annotation;
pub mod codec;
pub mod coupler;
pub mod error;
pub mod genome;
pub mod report;
pub mod role;
pub mod tally;
pub mod window;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
