pub mod daily_variable;
pub mod run_state;
pub mod weather_record;
