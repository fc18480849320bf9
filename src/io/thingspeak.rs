//! ThingSpeak-style telemetry transport
//!
//! One update is a single HTTP GET carrying the api key and the eight
//! occupancy fields in the query string. The server answers the entry id
//! of the stored update as plain text; `0` means the update was rejected
//! or rate-limited. No retries happen here - retry policy lives entirely
//! in the report gate's next-tick re-evaluation.

use crate::domain::types::{SubmitOutcome, TelemetryFields};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Transport seam for report attempts, so the reporter can be exercised
/// with scripted outcomes in tests.
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    async fn submit(&self, fields: &TelemetryFields) -> anyhow::Result<SubmitOutcome>;
}

pub struct ThingSpeakClient {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ThingSpeakClient {
    /// Build the client once; the underlying connection pool is reused
    /// across attempts.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.to_string(), api_key: api_key.to_string(), client })
    }

    fn update_url(&self, fields: &TelemetryFields) -> String {
        let mut url = format!("{}?api_key={}", self.url, self.api_key);
        for (i, val) in fields.0.iter().enumerate() {
            url.push_str(&format!("&field{}={}", i + 1, val));
        }
        url
    }
}

#[async_trait]
impl TelemetryTransport for ThingSpeakClient {
    async fn submit(&self, fields: &TelemetryFields) -> anyhow::Result<SubmitOutcome> {
        let url = self.update_url(fields);
        debug!(url = %url, "telemetry_request");

        let response = self.client.get(&url).send().await?;
        let http_status = response.status().as_u16();
        let body = response.text().await?;

        Ok(SubmitOutcome { http_status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{SensorLevel, SensorSample, SENSOR_COUNT};
    use tokio::time::Instant;

    #[test]
    fn test_update_url_carries_key_and_fields() {
        let client = ThingSpeakClient::new(
            "https://api.thingspeak.com/update",
            "TESTKEY",
            Duration::from_secs(5),
        )
        .unwrap();

        let mut levels = [SensorLevel::Clear; SENSOR_COUNT];
        levels[3] = SensorLevel::Blocked;
        let fields = TelemetryFields::from_sample(&SensorSample::new(levels, Instant::now()));

        let url = client.update_url(&fields);
        assert_eq!(
            url,
            "https://api.thingspeak.com/update?api_key=TESTKEY\
             &field1=0&field2=0&field3=0&field4=1\
             &field5=0&field6=0&field7=0&field8=0"
        );
    }
}
