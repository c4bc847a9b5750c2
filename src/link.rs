use log::warn;
use reqwest::Url;

use crate::client::{HostInfo, ProcessingClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLinks {
    pub primary: String,
    pub others: Vec<String>,
    /// True when the server reported no LAN address and the endpoint itself is offered.
    pub from_origin: bool,
}

/// `http://ip:port` for every address the server reported, in order.
pub fn links_from_host_info(info: &HostInfo, base_url: &Url) -> Vec<String> {
    if !info.success {
        return Vec::new();
    }
    let port = info
        .port
        .or_else(|| base_url.port_or_known_default())
        .unwrap_or(80);
    info.ips
        .iter()
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty())
        .map(|ip| format!("http://{ip}:{port}"))
        .collect()
}

pub fn origin_link(base_url: &Url) -> String {
    base_url.origin().ascii_serialization()
}

pub fn resolve(info: Option<&HostInfo>, base_url: &Url) -> NetworkLinks {
    let mut urls = info
        .map(|info| links_from_host_info(info, base_url))
        .unwrap_or_default();
    if urls.is_empty() {
        return NetworkLinks {
            primary: origin_link(base_url),
            others: Vec::new(),
            from_origin: true,
        };
    }
    let primary = urls.remove(0);
    NetworkLinks {
        primary,
        others: urls,
        from_origin: false,
    }
}

pub fn discover(client: &ProcessingClient) -> NetworkLinks {
    let info = match client.host_info() {
        Ok(info) => Some(info),
        Err(err) => {
            warn!("Host info unavailable ({err:#}); using the endpoint address");
            None
        }
    };
    resolve(info.as_ref(), client.base_url())
}
