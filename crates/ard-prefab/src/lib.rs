pub mod resource;
pub mod template;


pub mod prelude {
    pub use crate::{resource::*, template::*};
}
