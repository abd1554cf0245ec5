//! `weather`: Open-Meteo geocoding followed by the current-weather forecast.

use reqwest::Client;
use serde::Deserialize;

use super::{ToolError, json_body};

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Deserialize)]
struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
}

pub async fn current(
    client: &Client,
    geocoding_base: &str,
    forecast_base: &str,
    city: &str,
) -> Result<String, ToolError> {
    let geo: GeocodingResponse = json_body(
        client
            .get(format!("{}/v1/search", geocoding_base.trim_end_matches('/')))
            .query(&[("name", city), ("count", "1")])
            .send()
            .await?,
    )
    .await?;
    let place = geo
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::NotFound(format!("unknown city {city}")))?;

    let forecast: ForecastResponse = json_body(
        client
            .get(format!("{}/v1/forecast", forecast_base.trim_end_matches('/')))
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?,
    )
    .await?;

    let location = match &place.country {
        Some(country) => format!("{}, {country}", place.name),
        None => place.name.clone(),
    };
    let w = forecast.current_weather;
    Ok(format!(
        "Current weather in {location}: {:.1}°C, wind {:.1} km/h",
        w.temperature, w.windspeed
    ))
}
