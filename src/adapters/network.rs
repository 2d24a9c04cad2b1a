//! Outbound TCP connections observed from the kernel connection table.

use chrono::Local;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

const TCP_ESTABLISHED: &str = "01";

pub fn identify_service(port: u16) -> &'static str {
    match port {
        80 => "HTTP",
        443 => "HTTPS",
        53 => "DNS",
        22 => "SSH",
        21 => "FTP",
        25 => "SMTP",
        110 => "POP3",
        143 => "IMAP",
        993 => "IMAPS",
        995 => "POP3S",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConnection {
    pub local: SocketAddr,
    pub remote: SocketAddr,
}

fn is_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().map(|v4| v4.is_loopback()).unwrap_or(false)
        }
    }
}

fn parse_hex_ipv4(hex: &str) -> Option<Ipv4Addr> {
    let raw = u32::from_str_radix(hex, 16).ok()?;
    Some(Ipv4Addr::from(raw.to_ne_bytes()))
}

fn parse_hex_ipv6(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 {
        return None;
    }
    let mut bytes = [0u8; 16];
    for (i, chunk) in bytes.chunks_mut(4).enumerate() {
        let word = u32::from_str_radix(hex.get(i * 8..i * 8 + 8)?, 16).ok()?;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    Some(Ipv6Addr::from(bytes))
}

fn parse_endpoint(field: &str) -> Option<SocketAddr> {
    let (ip_hex, port_hex) = field.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let ip = if ip_hex.len() == 8 {
        IpAddr::V4(parse_hex_ipv4(ip_hex)?)
    } else {
        IpAddr::V6(parse_hex_ipv6(ip_hex)?)
    };
    Some(SocketAddr::new(ip, port))
}

/// Established connections from the text of `/proc/net/tcp` or `/proc/net/tcp6`.
pub fn parse_proc_net_tcp(content: &str) -> Vec<TcpConnection> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[3] != TCP_ESTABLISHED {
                return None;
            }
            Some(TcpConnection {
                local: parse_endpoint(fields[1])?,
                remote: parse_endpoint(fields[2])?,
            })
        })
        .collect()
}

pub struct NetworkMonitor {
    tables: Vec<PathBuf>,
    seen: HashSet<SocketAddr>,
    poll_interval: Duration,
}

impl NetworkMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self::with_tables(
            vec![PathBuf::from("/proc/net/tcp"), PathBuf::from("/proc/net/tcp6")],
            poll_interval,
        )
    }

    pub fn with_tables(tables: Vec<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            tables,
            seen: HashSet::new(),
            poll_interval,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.tables.iter().any(|t| t.exists())
    }

    /// Remote endpoints not reported before; loopback traffic is skipped.
    pub fn poll(&mut self) -> Vec<SocketAddr> {
        let mut fresh = Vec::new();
        for table in &self.tables {
            let content = match std::fs::read_to_string(table) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!("Cannot read {}: {}", table.display(), e);
                    continue;
                }
            };

            for conn in parse_proc_net_tcp(&content) {
                if is_loopback(&conn.local.ip()) || is_loopback(&conn.remote.ip()) {
                    continue;
                }
                if self.seen.insert(conn.remote) {
                    fresh.push(conn.remote);
                }
            }
        }
        fresh
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if !self.is_supported() {
            tracing::warn!("Network monitoring unavailable on this platform");
            return;
        }
        println!("🌐 Network Monitor Started");

        loop {
            for remote in self.poll() {
                println!(
                    "[{}] NETWORK: {} ({})",
                    Local::now().format("%H:%M:%S"),
                    remote,
                    identify_service(remote.port())
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
