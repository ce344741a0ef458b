#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod instrument;
pub mod margin;
pub mod math;
pub mod propagation;
pub mod report;
pub mod significance;
pub mod statistics;
pub mod uncertainty;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
