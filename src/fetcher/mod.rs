pub mod error;
pub mod extract;
pub mod weather_fetcher;
