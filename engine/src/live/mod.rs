//! Live trading seams
//!
//! The crate does not talk to an exchange or a chat service itself. This
//! module defines the injected capabilities ([`Exchange`], [`Notifier`],
//! [`CommandSource`]), the retry policy wrapped around the exchange, the
//! explicit [`Session`] state and the [`Trader`] that ties them to the
//! score strategy.

pub mod exchange;
pub mod retry;
pub mod notify;
pub mod session;
pub mod trader;

pub use exchange::*;
pub use retry::*;
pub use notify::*;
pub use session::*;
pub use trader::*;
