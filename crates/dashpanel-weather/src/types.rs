use serde::{Deserialize, Serialize};

/// Display icon for a weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionIcon {
    Thunderstorm,
    Snow,
    Clear,
    #[default]
    Cloud,
    Night,
}

impl ConditionIcon {
    /// Map an OpenWeather condition id and icon code to a display icon.
    ///
    /// Daytime codes end in `d`. Every nighttime condition shares one icon.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_condition(id: Option<i32>, icon: Option<&str>) -> Self {
        let id = match id {
            Some(id) if id != 0 => id,
            _ => return Self::Cloud,
        };

        if !icon.is_some_and(|code| code.ends_with('d')) {
            return Self::Night;
        }

        match id {
            200..=599 => Self::Thunderstorm,
            600..=699 => Self::Snow,
            800 => Self::Clear,
            _ => Self::Cloud,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "⛈️",
            Self::Snow => "🌨️",
            Self::Clear => "☀️",
            Self::Cloud => "🌤️",
            Self::Night => "🌙",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "cloud_lightning",
            Self::Snow => "cloud_snow",
            Self::Clear => "sun",
            Self::Cloud => "cloud_sun",
            Self::Night => "moon",
        }
    }
}

/// A normalized current-conditions reading for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub condition_id: i32,
    pub condition_icon: ConditionIcon,
    /// Short condition group such as "Clouds"
    pub description: String,
    /// Location name as reported by the provider
    pub location_name: String,
}

impl WeatherReading {
    pub fn rounded_temperature(&self) -> i64 {
        self.temperature.round() as i64
    }

    /// Compact label such as `☀️ 72°`
    pub fn label(&self) -> String {
        format!("{} {}°", self.condition_icon.glyph(), self.rounded_temperature())
    }
}

/// Current weather response body.
#[derive(Debug, Deserialize)]
pub(crate) struct CurrentWeatherResponse {
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MainBlock {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConditionBlock {
    pub id: Option<i32>,
    pub icon: Option<String>,
    #[serde(default)]
    pub main: String,
}

impl From<CurrentWeatherResponse> for WeatherReading {
    fn from(resp: CurrentWeatherResponse) -> Self {
        let condition = resp.weather.into_iter().next();
        let (id, icon, description) = match condition {
            Some(c) => (c.id, c.icon, c.main),
            None => (None, None, String::new()),
        };

        Self {
            temperature: resp.main.temp,
            condition_id: id.unwrap_or_default(),
            condition_icon: ConditionIcon::from_condition(id, icon.as_deref()),
            description,
            location_name: resp.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daytime_thunderstorm_range() {
        assert_eq!(ConditionIcon::from_condition(Some(200), Some("11d")), ConditionIcon::Thunderstorm);
        assert_eq!(ConditionIcon::from_condition(Some(501), Some("10d")), ConditionIcon::Thunderstorm);
        assert_eq!(ConditionIcon::from_condition(Some(599), Some("10d")), ConditionIcon::Thunderstorm);
    }

    #[test]
    fn test_daytime_snow_range() {
        assert_eq!(ConditionIcon::from_condition(Some(600), Some("13d")), ConditionIcon::Snow);
        assert_eq!(ConditionIcon::from_condition(Some(699), Some("13d")), ConditionIcon::Snow);
    }

    #[test]
    fn test_daytime_clear_and_cloud() {
        assert_eq!(ConditionIcon::from_condition(Some(800), Some("01d")), ConditionIcon::Clear);
        assert_eq!(ConditionIcon::from_condition(Some(801), Some("02d")), ConditionIcon::Cloud);
        assert_eq!(ConditionIcon::from_condition(Some(741), Some("50d")), ConditionIcon::Cloud);
    }

    #[test]
    fn test_nighttime_is_single_icon() {
        assert_eq!(ConditionIcon::from_condition(Some(800), Some("01n")), ConditionIcon::Night);
        assert_eq!(ConditionIcon::from_condition(Some(211), Some("11n")), ConditionIcon::Night);
        assert_eq!(ConditionIcon::from_condition(Some(800), None), ConditionIcon::Night);
    }

    #[test]
    fn test_missing_id_is_cloud() {
        assert_eq!(ConditionIcon::from_condition(None, Some("01n")), ConditionIcon::Cloud);
        assert_eq!(ConditionIcon::from_condition(Some(0), Some("01d")), ConditionIcon::Cloud);
    }

    #[test]
    fn test_reading_from_response() {
        let resp: CurrentWeatherResponse = serde_json::from_value(serde_json::json!({
            "main": {"temp": 71.6},
            "weather": [{"id": 800, "icon": "01d", "main": "Clear"}],
            "name": "West Chester"
        }))
        .unwrap();

        let reading = WeatherReading::from(resp);
        assert_eq!(reading.condition_icon, ConditionIcon::Clear);
        assert_eq!(reading.location_name, "West Chester");
        assert_eq!(reading.rounded_temperature(), 72);
        assert_eq!(reading.label(), "☀️ 72°");
    }

    #[test]
    fn test_reading_without_conditions() {
        let resp: CurrentWeatherResponse =
            serde_json::from_value(serde_json::json!({"main": {"temp": -3.4}})).unwrap();

        let reading = WeatherReading::from(resp);
        assert_eq!(reading.condition_id, 0);
        assert_eq!(reading.condition_icon, ConditionIcon::Cloud);
        assert_eq!(reading.rounded_temperature(), -3);
    }
}
