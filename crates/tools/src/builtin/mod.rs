//! Built-in tools.

mod calculator;
mod keywords;
mod weather;
mod web_search;
mod wikipedia;

pub use calculator::CalculatorTool;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;
