pub mod generation;
pub mod provider_key;
pub mod reward;
pub mod setting;
pub mod user;
