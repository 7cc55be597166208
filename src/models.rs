pub mod activity;
pub mod dashboard;
pub mod field;
pub mod grouping;
pub mod handoff;
pub mod lead;
pub mod settings;
pub mod view;
