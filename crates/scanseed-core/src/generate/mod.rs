pub mod engine;
pub mod key_pool;
pub mod plan;
pub mod populate;
pub mod value;
