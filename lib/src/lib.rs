mod animation;
mod api;
mod candidate;
mod config;
mod hash;
mod message;
mod mode;
mod poll;
mod render;
pub mod sampler;
mod spin;
mod sync;

pub use animation::*;
pub use api::*;
pub use candidate::*;
pub use config::*;
pub use hash::*;
pub use message::*;
pub use mode::*;
pub use poll::*;
pub use render::*;
pub use spin::*;
pub use sync::*;
