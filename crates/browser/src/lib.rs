#[cfg(feature = "cdp")]
mod cdp;
mod chrome;
pub mod error;
mod session;

#[cfg(feature = "cdp")]
pub use crate::cdp::{CdpSession, ChromeLauncher};
pub use crate::chrome::{CHROME_ENV, Chrome};
pub use crate::session::{BrowserSession, Launcher, Viewport, WaitCondition};
