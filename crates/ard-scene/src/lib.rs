pub mod legacy;
pub mod node;
pub mod save_load;
pub mod scene;


pub mod prelude {
    pub use crate::{
        legacy::LEGACY_ROOT_NAME,
        node::*,
        scene::*,
    };
}
