pub mod error;
pub mod greetings;

pub use error::{Error, Result};
pub use greetings::{GreetingEntry, GreetingTable, format_hello};
