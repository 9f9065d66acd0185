use tracing::debug;

use super::{require, Screen};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::store::SnapshotStore;
use crate::types::WeatherSnapshot;

pub const DEFAULT_CITY: &str = "Istanbul";
pub const CITY_REQUIRED: &str = "city name is required";

/// Current weather for one city. A failed load keeps the previous snapshot
/// and the previous city.
pub struct WeatherScreen {
    gateway: Gateway,
    snapshot: SnapshotStore<WeatherSnapshot>,
    city: String,
}

impl WeatherScreen {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            snapshot: SnapshotStore::new(),
            city: DEFAULT_CITY.to_string(),
        }
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.current()
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Loads another city. The city becomes current only if the load worked.
    pub fn search(&mut self, city: &str) -> Result<&WeatherSnapshot, GatewayError> {
        require(city, CITY_REQUIRED)?;
        let city = city.trim();
        let gateway = &self.gateway;
        let snapshot = self.snapshot.reload(|| gateway.weather(city))?;
        self.city = city.to_string();
        Ok(snapshot)
    }

    pub fn unmount(self) {
        debug!(city = %self.city, "weather screen unmounted");
    }
}

impl Screen for WeatherScreen {
    fn refresh(&mut self) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        let city = &self.city;
        self.snapshot.reload(|| gateway.weather(city))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{gateway, ScriptedTransport};

    fn snapshot(city: &str, temperature: f64) -> String {
        format!(
            r#"{{"city":"{city}","country":"TR","temperature":{temperature},"feels_like":20.0,"condition":"Clear","humidity":40,"wind_speed":3.1,"pressure":1012}}"#
        )
    }

    #[test]
    fn mount_loads_default_city() {
        let transport = ScriptedTransport::new();
        transport.reply(200, &snapshot("Istanbul", 24.5));
        let mut screen = WeatherScreen::new(gateway(&transport));
        screen.mount().unwrap();
        assert_eq!(screen.weather().unwrap().temperature, 24.5);
        assert!(transport.requests()[0].path.ends_with("city=Istanbul"));
    }

    #[test]
    fn failed_search_keeps_stale_snapshot() {
        let transport = ScriptedTransport::new();
        transport.reply(200, &snapshot("Istanbul", 24.5));
        let mut screen = WeatherScreen::new(gateway(&transport));
        screen.mount().unwrap();

        transport.fail(crate::error::ApiError::Transport("network unreachable".to_string()));
        let err = screen.search("Ankara").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(screen.weather().unwrap().city, "Istanbul");
        assert_eq!(screen.city(), "Istanbul");
    }

    #[test]
    fn successful_search_replaces_whole_snapshot() {
        let transport = ScriptedTransport::new();
        transport.reply(200, &snapshot("Ankara", 18.0));
        transport.reply(200, &snapshot("Ankara", 17.0));
        let mut screen = WeatherScreen::new(gateway(&transport));
        screen.search("  Ankara ").unwrap();
        assert_eq!(screen.city(), "Ankara");

        screen.refresh().unwrap();
        assert_eq!(screen.weather().unwrap().temperature, 17.0);
        assert!(transport.requests()[1].path.ends_with("city=Ankara"));
    }

    #[test]
    fn blank_city_is_rejected() {
        let transport = ScriptedTransport::new();
        let mut screen = WeatherScreen::new(gateway(&transport));
        assert_eq!(screen.search("").unwrap_err().message(), CITY_REQUIRED);
        assert_eq!(transport.request_count(), 0);
    }
}
