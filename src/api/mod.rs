// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod realtime_handler {
    pub use crate::realtime_handler::*;
}

pub mod routes {
    pub use crate::routes::*;
}

pub mod views {
    pub use crate::views::*;
}
