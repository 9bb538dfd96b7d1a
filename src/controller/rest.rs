//! REST controller gateway.
//!
//! Concrete [`ControllerGateway`] over the controller's REST dialect
//! (Ryu-style): topology discovery under `/v1.0/topology/*`, statistics
//! under `/stats/*`. All dpid and port parsing happens here, at the
//! decode boundary; malformed or missing fields surface as
//! [`ControllerError::Decode`] rather than propagating as nulls.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use super::types::{
    Dpid, HostAttachment, HostRecord, LinkRecord, PortCounters, SwitchRecord,
};
use super::{ControllerError, ControllerGateway};
use crate::config::ControllerConfig;

/// Client for the controller's REST API
pub struct RestControllerGateway {
    base_url: String,
    client: reqwest::Client,
}

impl RestControllerGateway {
    /// Build a client with the configured base URL and request timeout
    pub fn new(config: &ControllerConfig) -> color_eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ControllerError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ControllerError::Unreachable(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| ControllerError::Unreachable(format!("{}: {}", url, e)))?;

        response
            .json::<T>()
            .await
            .map_err(|e| ControllerError::Decode(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl ControllerGateway for RestControllerGateway {
    async fn list_switches(&self) -> Result<Vec<SwitchRecord>, ControllerError> {
        let raw: Vec<WireSwitch> = self.get_json("/v1.0/topology/switches").await?;
        decode_switches(raw)
    }

    async fn list_links(&self) -> Result<Vec<LinkRecord>, ControllerError> {
        let raw: Vec<WireLink> = self.get_json("/v1.0/topology/links").await?;
        decode_links(raw)
    }

    async fn list_hosts(&self) -> Result<Vec<HostRecord>, ControllerError> {
        let raw: Vec<WireHost> = self.get_json("/v1.0/topology/hosts").await?;
        decode_hosts(raw)
    }

    async fn port_stats(&self, dpid: Dpid) -> Result<Vec<PortCounters>, ControllerError> {
        let raw: HashMap<String, Vec<WirePortCounters>> =
            self.get_json(&format!("/stats/port/{}", dpid)).await?;
        decode_port_stats(dpid, raw)
    }

    async fn flow_stats(&self, dpid: Dpid) -> Result<Vec<serde_json::Value>, ControllerError> {
        let mut raw: HashMap<String, Vec<serde_json::Value>> =
            self.get_json(&format!("/stats/flow/{}", dpid)).await?;
        Ok(raw.remove(&dpid.to_string()).unwrap_or_default())
    }
}

// ---- Wire format ----
//
// Discovery endpoints render dpids and port numbers as zero-padded hex
// strings; the stats endpoints key their maps by the decimal dpid.

#[derive(Debug, Deserialize)]
struct WireSwitch {
    dpid: String,
}

#[derive(Debug, Deserialize)]
struct WireEndpoint {
    dpid: String,
    port_no: String,
}

#[derive(Debug, Deserialize)]
struct WireLink {
    src: WireEndpoint,
    dst: WireEndpoint,
}

#[derive(Debug, Deserialize)]
struct WireHost {
    mac: String,
    #[serde(default)]
    ipv4: Vec<String>,
    port: Option<WireEndpoint>,
}

#[derive(Debug, Deserialize)]
struct WirePortCounters {
    port_no: serde_json::Value,
    rx_packets: u64,
    tx_packets: u64,
    rx_bytes: u64,
    tx_bytes: u64,
}

fn parse_dpid(raw: &str) -> Result<Dpid, ControllerError> {
    Dpid::from_hex(raw)
        .ok_or_else(|| ControllerError::Decode(format!("malformed dpid '{}'", raw)))
}

fn parse_port(raw: &str) -> Result<u32, ControllerError> {
    u32::from_str_radix(raw, 16)
        .map_err(|_| ControllerError::Decode(format!("malformed port number '{}'", raw)))
}

fn decode_switches(raw: Vec<WireSwitch>) -> Result<Vec<SwitchRecord>, ControllerError> {
    raw.into_iter()
        .map(|s| Ok(SwitchRecord { dpid: parse_dpid(&s.dpid)? }))
        .collect()
}

fn decode_links(raw: Vec<WireLink>) -> Result<Vec<LinkRecord>, ControllerError> {
    raw.into_iter()
        .map(|l| {
            Ok(LinkRecord {
                src_dpid: parse_dpid(&l.src.dpid)?,
                src_port: parse_port(&l.src.port_no)?,
                dst_dpid: parse_dpid(&l.dst.dpid)?,
                dst_port: parse_port(&l.dst.port_no)?,
            })
        })
        .collect()
}

fn decode_hosts(raw: Vec<WireHost>) -> Result<Vec<HostRecord>, ControllerError> {
    raw.into_iter()
        .map(|h| {
            let attached = match h.port {
                Some(port) => Some(HostAttachment {
                    dpid: parse_dpid(&port.dpid)?,
                    port_no: parse_port(&port.port_no)?,
                }),
                None => None,
            };
            Ok(HostRecord {
                mac: h.mac,
                ipv4: h.ipv4,
                attached,
            })
        })
        .collect()
}

fn decode_port_stats(
    dpid: Dpid,
    mut raw: HashMap<String, Vec<WirePortCounters>>,
) -> Result<Vec<PortCounters>, ControllerError> {
    let rows = raw.remove(&dpid.to_string()).unwrap_or_default();

    let mut counters = Vec::with_capacity(rows.len());
    for row in rows {
        // The switch-local management port is reported with a
        // non-numeric port number; it carries no data-plane traffic.
        let port_no = match row.port_no.as_u64() {
            Some(n) => u32::try_from(n).map_err(|_| {
                ControllerError::Decode(format!("port number {} out of range", n))
            })?,
            None => {
                debug!("Skipping non-numeric port {:?} on switch {}", row.port_no, dpid);
                continue;
            }
        };
        counters.push(PortCounters {
            port_no,
            rx_packets: row.rx_packets,
            tx_packets: row.tx_packets,
            rx_bytes: row.rx_bytes,
            tx_bytes: row.tx_bytes,
        });
    }

    Ok(counters)
}
