pub mod client;
pub mod membership;
pub mod model;

pub use membership::SwarmMembership;
