use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, DurationRound, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::error::FetchError;
use crate::models::solar::Location;
use crate::models::weather::{HourlyData, HourlyWeatherResponse, WeatherSample};
use crate::services::timeline;

const HOURLY_FIELDS: &str = "temperature_2m,wind_speed_10m,cloud_cover";
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Hourly ambient weather for one local calendar day.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError>;
}

#[async_trait]
impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError> {
        (**self).fetch(location, date).await
    }
}

/// Open-Meteo forecast/archive client.
pub struct OpenMeteoClient {
    http: reqwest::Client,
    cfg: WeatherConfig,
}

impl OpenMeteoClient {
    pub fn new(cfg: WeatherConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn endpoint_for(&self, date: NaiveDate) -> &str {
        let today = Utc::now().date_naive();
        let archived = today
            .checked_sub_days(Days::new(self.cfg.archive_lag_days.max(0) as u64))
            .is_some_and(|cutoff| date < cutoff);
        if archived { &self.cfg.archive_url } else { &self.cfg.forecast_url }
    }

    async fn request(
        &self,
        url: &str,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlyWeatherResponse, FetchError> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "GMT".to_string()),
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .json::<HourlyWeatherResponse>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> Result<Vec<WeatherSample>, FetchError> {
        let targets = timeline::day_timestamps(date, location.offset()?)?;
        // The local day may straddle two UTC dates
        let (Some(first), Some(last)) = (targets.first(), targets.last()) else {
            return Err(FetchError::Empty(date));
        };
        let start = first.with_timezone(&Utc).date_naive();
        let end = last.with_timezone(&Utc).date_naive();
        let url = self.endpoint_for(date).to_string();

        let mut attempt = 0;
        let resp = loop {
            match self.request(&url, location, start, end).await {
                Ok(resp) => break resp,
                Err(e) if e.is_transient() && attempt < self.cfg.max_retries => {
                    attempt += 1;
                    warn!("[WEATHER] {} attempt {} failed: {}; retrying", date, attempt, e);
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        };

        let samples = align_hourly(&resp.hourly, &targets)?;
        debug!("[WEATHER] {} | {} hourly samples from {}", date, samples.len(), url);
        if samples.is_empty() {
            return Err(FetchError::Empty(date));
        }
        Ok(samples)
    }
}

/// Maps the provider's UTC hourly rows onto the local day grid.
/// A target instant takes the row of the UTC hour it falls in; rows without a
/// temperature are skipped.
pub fn align_hourly(
    hourly: &HourlyData,
    targets: &[DateTime<FixedOffset>],
) -> Result<Vec<WeatherSample>, FetchError> {
    let mut rows: HashMap<DateTime<Utc>, usize> = HashMap::with_capacity(hourly.time.len());
    for (i, raw) in hourly.time.iter().enumerate() {
        let t = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
            .map_err(|e| FetchError::Decode(format!("time \"{}\": {}", raw, e)))?;
        rows.insert(t.and_utc(), i);
    }

    let column = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten().unwrap_or(f64::NAN);

    let samples = targets
        .iter()
        .filter_map(|t| {
            let hour = t.with_timezone(&Utc).duration_trunc(TimeDelta::hours(1)).ok()?;
            let i = *rows.get(&hour)?;
            WeatherSample {
                timestamp: *t,
                temp_air_c: column(&hourly.temperature_2m, i),
                wind_speed_ms: column(&hourly.wind_speed_10m, i),
                cloud_cover_pct: column(&hourly.cloud_cover, i),
            }
            .sanitized()
        })
        .collect();
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn hourly_for(date: &str, hours: std::ops::Range<u32>) -> HourlyData {
        let time: Vec<String> = hours.clone().map(|h| format!("{}T{:02}:00", date, h)).collect();
        let n = time.len();
        HourlyData {
            time,
            temperature_2m: hours.map(|h| Some(10.0 + h as f64)).collect(),
            wind_speed_10m: vec![Some(2.0); n],
            cloud_cover: vec![Some(50.0); n],
        }
    }

    #[test]
    fn test_align_utc_day() {
        let targets = timeline::day_timestamps(
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        let samples = align_hourly(&hourly_for("2024-03-20", 0..24), &targets).unwrap();
        assert_eq!(samples.len(), 24);
        assert_eq!(samples[5].temp_air_c, 15.0);
        assert_eq!(samples[5].timestamp, targets[5]);
    }

    #[test]
    fn test_align_half_hour_zone_uses_containing_utc_hour() {
        // IST midnight = 18:30 UTC the previous day
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let targets = timeline::day_timestamps(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(), ist).unwrap();
        let mut hourly = hourly_for("2024-06-01", 0..24);
        let next = hourly_for("2024-06-02", 0..24);
        hourly.time.extend(next.time);
        hourly.temperature_2m.extend(next.temperature_2m);
        hourly.wind_speed_10m.extend(next.wind_speed_10m);
        hourly.cloud_cover.extend(next.cloud_cover);

        let samples = align_hourly(&hourly, &targets).unwrap();
        assert_eq!(samples.len(), 24);
        assert_eq!(samples[0].timestamp.hour(), 0);
        // 18:30 UTC falls in the 18:00 row
        assert_eq!(samples[0].temp_air_c, 28.0);
    }

    #[test]
    fn test_align_skips_missing_temperature() {
        let targets = timeline::day_timestamps(
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        let mut hourly = hourly_for("2024-03-20", 0..24);
        hourly.temperature_2m[3] = None;
        hourly.cloud_cover[4] = None;
        let samples = align_hourly(&hourly, &targets).unwrap();
        assert_eq!(samples.len(), 23);
        assert_eq!(samples[3].cloud_cover_pct, 0.0);
    }

    #[test]
    fn test_align_rejects_bad_time() {
        let hourly = HourlyData {
            time: vec!["yesterday".into()],
            temperature_2m: vec![Some(1.0)],
            wind_speed_10m: vec![],
            cloud_cover: vec![],
        };
        assert!(matches!(align_hourly(&hourly, &[]), Err(FetchError::Decode(_))));
    }
}
