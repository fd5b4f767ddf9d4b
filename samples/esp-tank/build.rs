fn main() {
    embuild::espidf::sysenv::output();

    for var in ["WIFI_SSID", "WIFI_PASS", "MQTT_HOST", "MQTT_PORT", "TANK_NAMESPACE"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
