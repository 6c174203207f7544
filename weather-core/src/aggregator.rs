//! Turns raw OpenWeather payloads into display-ready summaries.
//!
//! All arithmetic happens in Celsius; conversion to the display unit and
//! rounding happen once, when a value is written into a summary.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::model::{
    Condition, CurrentSummary, DailyForecastSummary, Fetched, RawForecast, RawForecastSlot,
    RawObservation, TemperatureUnit,
};

/// Number of days kept from a forecast response.
pub const FORECAST_DAYS: usize = 5;

/// m/s to km/h.
const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeatherAggregator {
    unit: TemperatureUnit,
}

impl WeatherAggregator {
    pub fn new(unit: TemperatureUnit) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    /// Change the display unit; later parses use the new unit.
    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        self.unit = unit;
    }

    /// Celsius to the display unit, rounded to the nearest whole degree.
    pub fn convert_temperature(&self, celsius: f64) -> i64 {
        let value = match self.unit {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        };
        value.round() as i64
    }

    /// `None` when the payload has no `main` temperature block or does not
    /// have the shape of a current-conditions response.
    pub fn parse_current(&self, fetched: &Fetched) -> Option<CurrentSummary> {
        if fetched.payload.get("main").is_none() {
            tracing::debug!("Current weather payload has no temperature block");
            return None;
        }

        let raw: RawObservation = match serde_json::from_value(fetched.payload.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("Malformed current weather payload: {}", err);
                return None;
            }
        };

        Some(self.summarize_observation(&raw, fetched.cache_age))
    }

    pub fn summarize_observation(
        &self,
        raw: &RawObservation,
        cache_age: Option<u64>,
    ) -> CurrentSummary {
        let offset = local_offset(raw.timezone);

        let (condition, description) = match raw.weather.first() {
            Some(w) => (w.main.clone(), w.description.as_str()),
            None => (Condition::Other("Unknown".to_owned()), ""),
        };
        let condition_label = if description.trim().is_empty() {
            condition.label().to_owned()
        } else {
            capitalize(description.trim())
        };

        let location = match raw.sys.country.as_deref() {
            Some(country) if !country.is_empty() => format!("{}, {}", raw.name, country),
            _ => raw.name.clone(),
        };

        let observed_at = raw.dt.and_then(|ts| DateTime::from_timestamp(ts, 0)).unwrap_or_else(Utc::now);

        CurrentSummary {
            location,
            last_updated: observed_at
                .with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            temperature: self.convert_temperature(raw.main.temp),
            feels_like: self.convert_temperature(raw.main.feels_like.unwrap_or(raw.main.temp)),
            unit: self.unit,
            icon: condition.icon(),
            condition,
            condition_label,
            humidity_pct: raw.main.humidity,
            wind_speed_kmh: (raw.wind.speed * MPS_TO_KMH).round() as i64,
            pressure_hpa: raw.main.pressure,
            visibility_km: (raw.visibility.unwrap_or(0.0) / 1000.0).round() as i64,
            sunrise: raw.sys.sunrise.and_then(|ts| clock_time(ts, offset)),
            sunset: raw.sys.sunset.and_then(|ts| clock_time(ts, offset)),
            cache_age,
        }
    }

    /// `None` when the payload has no slot list, a malformed slot, or no
    /// slots at all.
    pub fn parse_forecast(&self, fetched: &Fetched) -> Option<Vec<DailyForecastSummary>> {
        let raw: RawForecast = match serde_json::from_value(fetched.payload.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("Malformed forecast payload: {}", err);
                return None;
            }
        };

        self.summarize_slots(&raw.list, local_offset(raw.city.timezone))
    }

    /// Group slots by the calendar date they fall on at `offset` and reduce
    /// each of the first [`FORECAST_DAYS`] dates to one summary.
    pub fn summarize_slots(
        &self,
        slots: &[RawForecastSlot],
        offset: FixedOffset,
    ) -> Option<Vec<DailyForecastSummary>> {
        if slots.is_empty() {
            return None;
        }

        let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
        for slot in slots {
            let Some(at) = DateTime::from_timestamp(slot.dt, 0) else {
                tracing::debug!("Forecast slot has out-of-range timestamp {}", slot.dt);
                return None;
            };
            let date = at.with_timezone(&offset).date_naive();
            days.entry(date).or_insert_with(DayBucket::new).add(slot);
        }

        let summaries = days
            .into_iter()
            .take(FORECAST_DAYS)
            .map(|(date, bucket)| {
                let condition = bucket.dominant_condition();
                DailyForecastSummary {
                    date,
                    day_label: date.format("%a %d %b").to_string(),
                    icon: condition.icon(),
                    min: self.convert_temperature(bucket.min),
                    max: self.convert_temperature(bucket.max),
                    unit: self.unit,
                    condition,
                    avg_humidity_pct: bucket.average_humidity(),
                }
            })
            .collect();

        Some(summaries)
    }
}

/// Most frequent condition; ties go to the one seen first.
pub fn dominant_condition<'a, I>(conditions: I) -> Option<Condition>
where
    I: IntoIterator<Item = &'a Condition>,
{
    let mut counts: Vec<(&Condition, usize)> = Vec::new();
    for condition in conditions {
        match counts.iter_mut().find(|(seen, _)| *seen == condition) {
            Some((_, count)) => *count += 1,
            None => counts.push((condition, 1)),
        }
    }

    let mut best: Option<(&Condition, usize)> = None;
    for (condition, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((condition, count));
        }
    }
    best.map(|(condition, _)| condition.clone())
}

#[derive(Debug)]
struct DayBucket {
    min: f64,
    max: f64,
    humidity_sum: u32,
    conditions: Vec<Condition>,
}

impl DayBucket {
    fn new() -> Self {
        Self { min: f64::INFINITY, max: f64::NEG_INFINITY, humidity_sum: 0, conditions: Vec::new() }
    }

    fn add(&mut self, slot: &RawForecastSlot) {
        self.min = self.min.min(slot.main.temp_min);
        self.max = self.max.max(slot.main.temp_max);
        self.humidity_sum += u32::from(slot.main.humidity);
        self.conditions.push(slot.condition());
    }

    fn dominant_condition(&self) -> Condition {
        dominant_condition(&self.conditions)
            .unwrap_or_else(|| Condition::Other("Unknown".to_owned()))
    }

    fn average_humidity(&self) -> u8 {
        if self.conditions.is_empty() {
            return 0;
        }
        (f64::from(self.humidity_sum) / self.conditions.len() as f64).round() as u8
    }
}

/// Offset of the location's clock; UTC when the upstream does not say.
pub fn local_offset(timezone_secs: Option<i32>) -> FixedOffset {
    timezone_secs
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn clock_time(ts: i64, offset: FixedOffset) -> Option<String> {
    DateTime::from_timestamp(ts, 0).map(|at| at.with_timezone(&offset).format("%H:%M").to_string())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
