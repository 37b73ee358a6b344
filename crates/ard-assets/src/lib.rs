pub mod asset;
pub mod package;


pub mod prelude {
    pub use crate::{asset::*, package::folder::*, package::*};
}
