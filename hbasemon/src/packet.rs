//! Packet view: normalizes a captured frame into the pieces the pipeline
//! works with.
//!
//! Walks Ethernet → IPv4 → TCP by offset and yields the segment's endpoint
//! addresses plus its payload. Anything that is not an IPv4 TCP segment
//! with a non-empty payload touching a monitored port is discarded here,
//! before any per-client state is consulted.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

/// Ethernet header length (no VLAN tags).
const ETH_LEN: usize = 14;
/// EtherType for IPv4, network byte order offset 12.
const ETHERTYPE_IPV4: u16 = 0x0800;
/// IP protocol number for TCP.
const IP_PROTO_TCP: u8 = 6;

/// Direction of a segment relative to the RegionServer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → server: a request.
    Inbound,
    /// Server → client: a response.
    Outbound,
}

impl Direction {
    pub fn is_inbound(self) -> bool {
        matches!(self, Direction::Inbound)
    }
}

/// The non-server endpoint of a duplex conversation. Two segments belong to
/// the same client iff their non-server endpoints match, irrespective of
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub addr: IpAddr,
    pub port: u16,
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// An IPv4 TCP segment relevant to the monitored ports.
#[derive(Debug)]
pub struct TcpView<'a> {
    pub src_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

impl TcpView<'_> {
    /// Inbound iff the destination port is a monitored server port.
    pub fn direction(&self, ports: &HashSet<u16>) -> Direction {
        if ports.contains(&self.dst_port) {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }

    /// The non-server endpoint for the given direction.
    pub fn client(&self, direction: Direction) -> ClientKey {
        match direction {
            Direction::Inbound => ClientKey {
                addr: IpAddr::V4(self.src_addr),
                port: self.src_port,
            },
            Direction::Outbound => ClientKey {
                addr: IpAddr::V4(self.dst_addr),
                port: self.dst_port,
            },
        }
    }

    /// The server endpoint address for the given direction.
    pub fn server(&self, direction: Direction) -> IpAddr {
        match direction {
            Direction::Inbound => IpAddr::V4(self.dst_addr),
            Direction::Outbound => IpAddr::V4(self.src_addr),
        }
    }
}

/// Parses a captured frame into a [`TcpView`].
///
/// Returns `None` for non-IPv4 frames, non-TCP datagrams, segments without
/// payload, truncated captures, and segments where neither endpoint port is
/// in `ports`.
pub fn parse<'a>(data: &'a [u8], ports: &HashSet<u16>) -> Option<TcpView<'a>> {
    if data.len() < ETH_LEN {
        return None;
    }
    let ether_type = u16::from_be_bytes([data[12], data[13]]);
    if ether_type != ETHERTYPE_IPV4 {
        return None;
    }

    let ip = &data[ETH_LEN..];
    if ip.len() < 20 || ip[0] >> 4 != 4 {
        return None;
    }
    let ihl = ((ip[0] & 0x0f) as usize) * 4;
    let total_len = u16::from_be_bytes([ip[2], ip[3]]) as usize;
    if ihl < 20 || ip.len() < total_len || total_len < ihl {
        return None;
    }
    if ip[9] != IP_PROTO_TCP {
        return None;
    }
    let src_addr = Ipv4Addr::new(ip[12], ip[13], ip[14], ip[15]);
    let dst_addr = Ipv4Addr::new(ip[16], ip[17], ip[18], ip[19]);

    let tcp = &ip[ihl..total_len];
    if tcp.len() < 20 {
        return None;
    }
    let src_port = u16::from_be_bytes([tcp[0], tcp[1]]);
    let dst_port = u16::from_be_bytes([tcp[2], tcp[3]]);
    let data_offset = ((tcp[12] >> 4) as usize) * 4;
    if data_offset < 20 || tcp.len() < data_offset {
        return None;
    }
    let payload = &tcp[data_offset..];
    if payload.is_empty() {
        return None;
    }

    if !ports.contains(&src_port) && !ports.contains(&dst_port) {
        return None;
    }

    Some(TcpView {
        src_addr,
        src_port,
        dst_addr,
        dst_port,
        payload,
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Raw-frame builder shared by the pipeline tests.

    /// Builds an Ethernet/IPv4/TCP frame carrying `payload`.
    pub fn tcp_frame(
        src: (std::net::Ipv4Addr, u16),
        dst: (std::net::Ipv4Addr, u16),
        payload: &[u8],
    ) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + 20 + 20 + payload.len());
        // Ethernet: zero MACs, IPv4 ethertype.
        frame.extend_from_slice(&[0u8; 12]);
        frame.extend_from_slice(&0x0800u16.to_be_bytes());
        // IPv4 header, no options.
        let total_len = (20 + 20 + payload.len()) as u16;
        frame.push(0x45);
        frame.push(0);
        frame.extend_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(&[0, 0, 0, 0]); // id, flags/frag
        frame.push(64); // ttl
        frame.push(6); // tcp
        frame.extend_from_slice(&[0, 0]); // checksum, unverified
        frame.extend_from_slice(&src.0.octets());
        frame.extend_from_slice(&dst.0.octets());
        // TCP header, no options.
        frame.extend_from_slice(&src.1.to_be_bytes());
        frame.extend_from_slice(&dst.1.to_be_bytes());
        frame.extend_from_slice(&[0; 8]); // seq, ack
        frame.push(5 << 4); // data offset = 5 words
        frame.push(0x18); // PSH|ACK
        frame.extend_from_slice(&[0, 0, 0, 0, 0, 0]); // window, checksum, urg
        frame.extend_from_slice(payload);
        frame
    }
}
