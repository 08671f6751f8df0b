use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

pub mod api;

pub const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

pub const MIN_TEMPERATURE_C: i32 = -20;
pub const MAX_TEMPERATURE_C: i32 = 55;

pub const DEFAULT_FORECAST_DAYS: u32 = 5;
pub const MAX_FORECAST_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherForecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub summary: String,
}

impl WeatherForecast {
    /// Fahrenheit equivalent of [`Self::temperature_c`], rounded down.
    pub fn temperature_f(&self) -> i32 {
        32 + (f64::from(self.temperature_c) / 0.5556).floor() as i32
    }
}

/// Generates random forecasts. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherForecastService;

impl WeatherForecastService {
    pub fn new() -> Self {
        Self
    }

    /// Returns one forecast per day for the `days` days after today (UTC).
    #[tracing::instrument(skip(self))]
    pub fn get_forecasts(&self, days: u32) -> Vec<WeatherForecast> {
        self.forecasts_from(Utc::now().date_naive(), days, &mut rand::thread_rng())
    }

    /// Returns one forecast per day for the `days` days after `today`, drawing from `rng`.
    pub fn forecasts_from<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        days: u32,
        rng: &mut R,
    ) -> Vec<WeatherForecast> {
        (1..=days)
            .map_while(|offset| today.checked_add_days(Days::new(u64::from(offset))))
            .map(|date| WeatherForecast {
                date,
                temperature_c: rng.gen_range(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C),
                summary: SUMMARIES
                    .choose(rng)
                    .copied()
                    .unwrap_or(SUMMARIES[0])
                    .to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn forecast(temperature_c: i32) -> WeatherForecast {
        WeatherForecast {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            temperature_c,
            summary: "Mild".to_string(),
        }
    }

    #[test]
    fn can_convert_to_fahrenheit() {
        assert_eq!(forecast(0).temperature_f(), 32);
        assert_eq!(forecast(100).temperature_f(), 211);
        assert_eq!(forecast(-20).temperature_f(), -4);
        assert_eq!(forecast(-1).temperature_f(), 30);
        assert_eq!(forecast(55).temperature_f(), 130);
    }

    #[test]
    fn can_generate_consecutive_days_starting_tomorrow() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let forecasts = WeatherForecastService::new().forecasts_from(today, 3, &mut rng);

        let dates: Vec<NaiveDate> = forecasts.iter().map(|f| f.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn can_keep_values_within_range_and_vocabulary() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let forecasts = WeatherForecastService::new().forecasts_from(today, 500, &mut rng);

        assert_eq!(forecasts.len(), 500);
        for forecast in &forecasts {
            assert!((MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&forecast.temperature_c));
            assert!(SUMMARIES.contains(&forecast.summary.as_str()));
        }
    }

    #[test]
    fn can_return_exactly_requested_number_of_days() {
        let service = WeatherForecastService::new();

        for days in [1, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS] {
            let forecasts = service.get_forecasts(days);
            assert_eq!(forecasts.len(), days as usize);
            assert!(forecasts.windows(2).all(|pair| pair[0].date < pair[1].date));
            assert!(forecasts[0].date > Utc::now().date_naive());
        }
    }
}
