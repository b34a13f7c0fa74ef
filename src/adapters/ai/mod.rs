//! Forecast adapters. Implement ForecastPort.
//!
//! Provides the Gemini REST adapter, plus a counting mock for tests.

pub mod gemini_adapter;
#[cfg(test)]
pub mod mock_adapter;

pub use gemini_adapter::GeminiAdapter;
#[cfg(test)]
pub use mock_adapter::MockForecastAdapter;
