use std::fs;
use std::path::Path;

const WIFI_CONFIG: &str = "wifi_config.h";

// Value of `#define NAME "value"` in a C header
fn define_value<'a>(contents: &'a str, name: &str) -> Option<&'a str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("#define"))
        .find(|l| l.split_whitespace().nth(1) == Some(name))
        .and_then(|l| l.split('"').nth(1))
}

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    embuild::espidf::sysenv::output();

    println!("cargo:rustc-link-arg=-Wl,--undefined=esp_backtrace_print_app_description");
    println!("cargo:rerun-if-changed={}", WIFI_CONFIG);

    // Credentials are compiled in; nothing is stored in NVS
    if Path::new(WIFI_CONFIG).exists() {
        let contents = fs::read_to_string(WIFI_CONFIG)?;
        for name in ["WIFI_SSID", "WIFI_PASSWORD"] {
            match define_value(&contents, name) {
                Some(value) => println!("cargo:rustc-env={}={}", name, value),
                None => {
                    println!("cargo:rustc-env={}=", name);
                    println!("cargo:warning={} has no {} define", WIFI_CONFIG, name);
                }
            }
        }
    } else {
        println!("cargo:rustc-env=WIFI_SSID=");
        println!("cargo:rustc-env=WIFI_PASSWORD=");
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
    }

    Ok(())
}
