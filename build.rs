fn main() {
    // Credentials and endpoints are baked in at compile time (see
    // `config::BootstrapConfig::from_build_env`).
    for var in [
        "WIFI_SSID",
        "WIFI_PASSWORD",
        "MQTT_URI",
        "MQTT_USERNAME",
        "MQTT_PASSWORD",
        "OTA_URL",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
