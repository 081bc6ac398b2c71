pub mod generation_repo;
pub mod provider_key_repo;
pub mod reward_repo;
pub mod setting_repo;
pub mod user_repo;

pub use generation_repo::GenerationRepo;
pub use provider_key_repo::ProviderKeyRepo;
pub use reward_repo::RewardRepo;
pub use setting_repo::SettingRepo;
pub use user_repo::UserRepo;
