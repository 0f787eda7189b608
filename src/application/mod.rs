pub mod builders;
pub mod payload;
pub mod retry;
pub mod services;
