pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod field_repo;
pub use field_repo::FieldRepository;
pub mod view_repo;
pub use view_repo::ViewRepository;
pub mod group_repo;
pub use group_repo::GroupPreferenceRepository;
pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod handoff_repo;
pub use handoff_repo::HandoffRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
