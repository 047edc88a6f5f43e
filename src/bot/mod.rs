pub mod access;
pub mod admin;
pub mod commands;
pub mod dialogue;
pub mod handlers;
pub mod kpi;
pub mod menu;
pub mod messenger;
pub mod reports;
pub mod texts;
