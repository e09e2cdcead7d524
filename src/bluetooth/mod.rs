pub mod decoder;
pub mod matcher;
pub mod scanner;
pub mod session;
