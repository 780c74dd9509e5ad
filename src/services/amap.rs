//! Amap (Gaode) web service client: live weather lookup.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{Body, CallContext, CallError, Classifiable, Client, ClientRuntime};
use crate::config::schema::AmapConfig;
use std::sync::Arc;

pub const WEATHER_PATH: &str = "/v3/weather/weatherInfo";

/// Weather lookup reply. `status` is "1" on success, "0" on failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherInfo {
    pub status: String,
    pub count: String,
    pub info: String,
    pub infocode: String,
    pub lives: Vec<LiveWeather>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveWeather {
    pub province: String,
    pub city: String,
    pub adcode: String,
    pub weather: String,
    pub temperature: String,
    pub winddirection: String,
    pub windpower: String,
    pub humidity: String,
    pub reporttime: String,
}

impl Classifiable for WeatherInfo {
    fn code(&self) -> i64 {
        if self.status == "1" {
            0
        } else {
            // A failed lookup without a parsable infocode still reports non-zero.
            self.infocode.parse().ok().filter(|c| *c != 0).unwrap_or(-1)
        }
    }

    fn message(&self) -> &str {
        &self.info
    }

    fn set_failure(&mut self, code: i64, message: &str) {
        self.status = "0".to_string();
        self.infocode = code.to_string();
        self.info = message.to_string();
    }
}

/// Typed wrapper over the configured Amap child service.
#[derive(Clone)]
pub struct AmapClient {
    client: Client,
    key: String,
    default_city: String,
}

impl AmapClient {
    pub fn new(runtime: &Arc<ClientRuntime>, config: &AmapConfig) -> Result<Self, CallError> {
        Ok(Self {
            client: runtime.client(&config.service)?,
            key: config.key.clone(),
            default_city: config.default_city.clone(),
        })
    }

    /// Live weather for `city` (adcode), or the configured default city.
    pub async fn weather_info(
        &self,
        ctx: &CallContext,
        city: Option<&str>,
    ) -> Result<WeatherInfo, CallError> {
        let city = city.filter(|c| !c.is_empty()).unwrap_or(&self.default_city);
        let body = weather_request(city, &self.key);

        let mut reply = WeatherInfo::default();
        match self.client.get(ctx, WEATHER_PATH, &body, &mut reply).await {
            Ok(()) => Ok(reply),
            Err(e) => {
                tracing::error!(city = %city, error = %e, info = %reply.info, "Weather lookup failed");
                Err(e)
            }
        }
    }
}

fn weather_request(city: &str, key: &str) -> Body {
    let mut body = Body::new();
    body.insert("city".into(), json!(city));
    body.insert("key".into(), json!(key));
    body.insert("extensions".into(), json!("base"));
    body.insert("output".into(), json!("JSON"));
    body
}
