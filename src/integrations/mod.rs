//! External service integrations.

pub mod rest_client {
    pub use crate::rest_client::*;
}

pub mod store {
    pub use crate::store::*;
}

pub mod realtime_models {
    pub use crate::realtime_models::*;
}
