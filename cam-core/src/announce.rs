/// Boot console announcements
use std::net::Ipv4Addr;

use crate::config::ServerConfig;
use crate::routes::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub stream_url: String,
    pub command_url: String,
    pub update_url: String,
}

fn base_url(ip: Ipv4Addr, port: u16) -> String {
    if port == 80 {
        format!("http://{}", ip)
    } else {
        format!("http://{}:{}", ip, port)
    }
}

pub fn endpoints(ip: Ipv4Addr, server: &ServerConfig) -> Endpoints {
    Endpoints {
        stream_url: format!("{}{}", base_url(ip, server.stream_port), server.stream_path),
        command_url: format!("{}{}", base_url(ip, server.command_port), Route::FlashOn.path()),
        update_url: format!("{}/update", base_url(ip, server.update_port)),
    }
}

/// Lines printed once the network is up, in order
pub fn boot_lines(ip: Ipv4Addr, server: &ServerConfig) -> Vec<String> {
    let endpoints = endpoints(ip, server);
    vec![
        format!("WiFi connected with IP {}", ip),
        format!("Stream Link: {}", endpoints.stream_url),
        format!("HTTP Command Link: {}", endpoints.command_url),
    ]
}
