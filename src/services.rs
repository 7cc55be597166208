pub mod activity_service;
pub use activity_service::ActivityService;
pub mod field_service;
pub use field_service::FieldService;
pub mod grouping;
pub mod handoff_service;
pub use handoff_service::HandoffService;
pub mod jobtread;
pub use jobtread::JobTreadClient;
pub mod lead_service;
pub use lead_service::LeadService;
pub mod settings_service;
pub use settings_service::SettingsService;
pub mod view_service;
pub use view_service::ViewService;
pub mod webhook;
