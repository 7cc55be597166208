pub mod activities;
pub mod dashboard;
pub mod fields;
pub mod handoffs;
pub mod leads;
pub mod settings;
pub mod views;
