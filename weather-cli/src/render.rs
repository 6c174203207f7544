use std::fmt::Write as _;

use weather_core::{CurrentSummary, DailyForecastSummary};

pub fn current(summary: &CurrentSummary) -> String {
    let unit = summary.unit;
    let mut out = String::new();

    let cache_note = summary
        .cache_age
        .map(|age| format!(" (cached: {} min old)", age / 60))
        .unwrap_or_default();

    let _ = writeln!(out, "Location:     {}", summary.location);
    let _ = writeln!(out, "Last updated: {}{}", summary.last_updated, cache_note);
    let _ = writeln!(
        out,
        "Temperature:  {}°{unit} (feels like {}°{unit})",
        summary.temperature, summary.feels_like
    );
    let _ = writeln!(out, "Conditions:   {} {}", summary.condition_label, summary.icon);
    let _ = writeln!(out, "Humidity:     {}%", summary.humidity_pct);
    let _ = writeln!(out, "Wind:         {} km/h", summary.wind_speed_kmh);
    let _ = writeln!(out, "Pressure:     {} hPa", summary.pressure_hpa);
    let _ = writeln!(out, "Visibility:   {} km", summary.visibility_km);
    if let Some(sunrise) = &summary.sunrise {
        let _ = writeln!(out, "Sunrise:      {sunrise}");
    }
    if let Some(sunset) = &summary.sunset {
        let _ = writeln!(out, "Sunset:       {sunset}");
    }

    out
}

pub fn forecast(days: &[DailyForecastSummary]) -> String {
    let mut out = String::from("\n5-Day Forecast:\n");
    for day in days {
        let _ = writeln!(
            out,
            "{}: {}  {}°{unit} / {}°{unit}  {} (Humidity: {}%)",
            day.day_label,
            day.icon,
            day.max,
            day.min,
            day.condition,
            day.avg_humidity_pct,
            unit = day.unit,
        );
    }
    out
}
