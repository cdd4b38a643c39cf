#![no_main]

use figment::Figment;
use figment::providers::{Format, Yaml};
use libfuzzer_sys::fuzz_target;
use vendor_gateway::GatewayConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = Figment::new().merge(Yaml::string(s)).extract::<GatewayConfig>() {
            let _ = config.validate();
        }
    }
});
