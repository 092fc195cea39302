pub mod activations;
pub mod layers;
pub mod loss;
mod model;
mod replica;
mod sequential;

pub use model::{Model, ParamSlot};
pub use replica::Replica;
pub use sequential::Sequential;
