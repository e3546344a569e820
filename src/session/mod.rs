pub mod config;
pub mod controller;
pub mod edge;
pub mod locks;
pub mod metadata;
pub mod poll;
pub mod status;
pub mod types;


pub use config::*;
pub use controller::*;
pub use edge::*;
pub use locks::*;
pub use metadata::*;
pub use poll::*;
pub use status::*;
pub use types::*;
