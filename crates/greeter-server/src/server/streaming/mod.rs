pub mod processor;
pub mod request;
