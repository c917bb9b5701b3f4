//! Core library for the `cityweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the `WeatherClient` trait
//! - Shared domain models (queries, results)
//! - `FetchController`, which runs one lookup at a time and publishes its state
//!
//! It is used by `cityweather-cli`, but any front end can drive a
//! `FetchController` and watch its state.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;

pub use client::{WeatherClient, client_from_config, openweather::OpenWeatherClient};
pub use config::Config;
pub use controller::{FETCH_ERROR_MESSAGE, FetchController, FetchOutcome, FetchState, Rejection};
pub use error::{NetworkError, ParseError, QueryError, WeatherError};
pub use model::{UnitSystem, WeatherQuery, WeatherResult};
