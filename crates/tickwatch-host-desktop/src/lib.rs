//! Desktop host adapters for tickwatchd
//!
//! Concrete implementations of the `tickwatch-host-api` seams:
//! - `ChromiumPageDriver`: drives portal pages through a headless
//!   Chromium via the DevTools protocol
//! - `DesktopNotifier`: raises notifications through `notify-send`,
//!   reporting click actions back as events
//! - `open_external`: hands a deep link to the desktop's URL handler
//! - `probe_portal`: cheap HTTP reachability check before a login attempt

mod browser;
mod notify;
mod open;
mod probe;

pub use browser::*;
pub use notify::*;
pub use open::*;
pub use probe::*;
