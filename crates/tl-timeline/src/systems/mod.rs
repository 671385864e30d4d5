mod viewport_projection;

pub use viewport_projection::viewport_projection_system;
