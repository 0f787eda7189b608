pub mod entities;
pub mod errors;
pub mod presets;
pub mod trace;
pub mod value_objects;
