pub mod error;
pub mod weather_loader;
