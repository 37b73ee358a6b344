pub mod graph;
pub mod observer;
pub mod resource;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::{graph::*, observer::*, resource::*};
}
