//! Driver layer for browser automation.
//!
//! This crate owns the one shared browser process the service runs and hands
//! out isolated pages (tabs) on it.
//!
//! - [`browser::BrowserManager`]: lazily launches, reuses, and tears down the shared browser
//! - [`browser::driver::FantocciniLauncher`]: WebDriver-backed launcher
//! - [`browser::page::FantocciniPage`]: one tab, driven under the browser's window lock
//! - [`browser::stealth`]: server-safe launch arguments and identity scripts
pub mod browser;
