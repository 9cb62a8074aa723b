#[cfg(windows)]
mod com;
mod driver;
mod errors;
pub mod mock;
mod platform;
pub mod sys;
mod types;

#[cfg(windows)]
pub use com::ComDriver;
pub use driver::{AsioDriver, Platform};
pub use errors::AsioError;
pub use platform::SystemPlatform;
pub use types::{BufferSizeRange, MessageSelector, SampleType};

pub type AsioRes<T> = Result<T, errors::AsioError>;
