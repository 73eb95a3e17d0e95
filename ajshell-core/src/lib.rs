pub mod config;
pub mod error;
pub mod model;
pub mod reducer;
pub mod state;

// Startup sequence
pub mod bootstrap;
pub mod plugin;
pub mod routes;
pub mod session;

// Navigation and quick search
pub mod catalog;
pub mod debounce;
pub mod i18n;
pub mod palette;
pub mod rank;

// Shell frame
pub mod countdown;
pub mod layout;
