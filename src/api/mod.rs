pub mod scanner;

pub use scanner::FlashScanner;
