// Domain-layer modules and shared errors/models
pub mod analytics {
    pub use crate::analytics::*;
}

pub mod band {
    pub use crate::band::*;
}

pub mod filter {
    pub use crate::filter::*;
}

pub mod loader {
    pub use crate::loader::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod radar {
    pub use crate::radar::*;
}

pub mod errors {
    pub use crate::errors::*;
}
