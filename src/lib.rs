pub mod log {
    pub use ard_log::*;
}

pub mod save_load {
    pub use ard_save_load::*;
}

pub mod scene {
    pub use ard_scene::*;
}

pub mod prefab {
    pub use ard_prefab::*;
}

pub mod assets {
    pub use ard_assets::*;
}

pub mod resource {
    pub use ard_resource::*;
}

pub mod prelude {
    pub use ard_assets::prelude::*;
    pub use ard_prefab::prelude::*;
    pub use ard_resource::prelude::*;
    pub use ard_save_load::prelude::*;
    pub use ard_scene::prelude::*;
}
