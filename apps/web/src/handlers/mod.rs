pub mod editor;
pub mod health;
pub mod historical;
pub mod pages;
pub mod reports;
pub mod scenarios;
pub mod simulator;
pub mod upload;

pub use health::health;
