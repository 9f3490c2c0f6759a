pub mod cache;
pub mod commands;
pub mod dependency;
pub mod error;
pub mod i18n;
pub mod index;
pub mod lifecycle;
pub mod lock;
pub mod package;
pub mod registry;
pub mod runtime;
pub mod script;
