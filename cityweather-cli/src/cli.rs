use anyhow::{Context, anyhow};
use cityweather_core::{
    Config, FetchController, FetchOutcome, Rejection, UnitSystem, client_from_config,
};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};

use crate::render::render_state;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather for any city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default unit system.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name, e.g. "Paris" or "Portland,US".
        city: String,

        /// "metric" (Celsius) or "imperial" (Fahrenheit); defaults to the configured value.
        #[arg(long, short)]
        units: Option<UnitSystem>,
    },

    /// Look up cities one after another until cancelled (Esc / Ctrl-C).
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, units } => show(&city, units).await,
            Command::Interactive => interactive().await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let mut prompt = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation();
    if config.api_key.is_some() {
        prompt = prompt.with_help_message("Leave empty to keep the current key");
    }
    let api_key = prompt.prompt()?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let current = config.default_units();
    let cursor = UnitSystem::all().iter().position(|u| *u == current).unwrap_or(0);
    let units = Select::new("Default unit system:", UnitSystem::all().to_vec())
        .with_starting_cursor(cursor)
        .prompt()?;
    config.default_units = Some(units);

    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

fn controller_from_config() -> anyhow::Result<(Config, FetchController)> {
    let config = Config::load()?;
    let client = client_from_config(&config)?;
    Ok((config, FetchController::new(client)))
}

async fn show(city: &str, units: Option<UnitSystem>) -> anyhow::Result<()> {
    let (config, controller) = controller_from_config()?;
    let units = units.unwrap_or_else(|| config.default_units());

    let outcome = controller.fetch_weather(city, units).await;
    print!("{}", render_state(&controller.state()));

    match outcome {
        FetchOutcome::Loaded(_) => Ok(()),
        FetchOutcome::Failed(err) => Err(err).context("Weather lookup failed"),
        FetchOutcome::Rejected(Rejection::InvalidQuery(err)) => Err(err.into()),
        FetchOutcome::Rejected(Rejection::InFlight) => {
            Err(anyhow!("Another weather lookup is already running"))
        }
    }
}

async fn interactive() -> anyhow::Result<()> {
    let (config, controller) = controller_from_config()?;
    let mut units = config.default_units();

    let mut rx = controller.subscribe();
    let status = tokio::spawn(async move {
        let mut was_loading = false;
        while rx.changed().await.is_ok() {
            let loading = rx.borrow_and_update().is_loading;
            if loading && !was_loading {
                eprintln!("Loading weather data...");
            }
            was_loading = loading;
        }
    });

    loop {
        let city = match Text::new("Enter city name:").prompt() {
            Ok(city) => city,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };
        if city.trim().is_empty() {
            println!("Please enter a city name.");
            continue;
        }

        let cursor = UnitSystem::all().iter().position(|u| *u == units).unwrap_or(0);
        units = match Select::new("Unit system:", UnitSystem::all().to_vec())
            .with_starting_cursor(cursor)
            .prompt()
        {
            Ok(units) => units,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        controller.fetch_weather(&city, units).await;
        println!("{}", render_state(&controller.state()));
    }

    status.abort();
    Ok(())
}
