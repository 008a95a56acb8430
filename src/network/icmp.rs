//! ICMP implementation for native ping functionality

use crate::network::ping::SystemPinger;
use crate::network::LivenessProbe;
use crate::{ScanError, ScanResult};
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use rand::Rng;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// ICMP header (8) plus payload
const ECHO_PACKET_LEN: usize = 64;
const ECHO_PAYLOAD: &[u8] = b"hostwatch";
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Raw-socket ICMP echo prober.
///
/// Each echo opens its own raw socket, so concurrent echoes never steal each
/// other's replies; replies are matched on source, identifier and sequence.
/// IPv6 targets go through the system ping instead.
pub struct IcmpPinger {
    identifier: u16,
    sequence: AtomicU16,
    ipv6: SystemPinger,
}

impl IcmpPinger {
    /// Create a new ICMP pinger.
    ///
    /// Fails with `PermissionError` when raw sockets are not available to
    /// this process.
    pub fn new() -> crate::Result<Self> {
        drop(open_raw_socket()?);

        let mut rng = rand::thread_rng();
        Ok(Self {
            identifier: rng.gen::<u16>(),
            sequence: AtomicU16::new(rng.gen::<u16>()),
            ipv6: SystemPinger::new(),
        })
    }

    /// Ping a single IPv4 host, waiting at most `timeout` for the reply
    pub async fn ping(&self, target: Ipv4Addr, timeout: Duration) -> ScanResult<bool> {
        let socket = open_raw_socket()?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let packet = build_echo_request(self.identifier, sequence);

        let dest = SockAddr::from(SocketAddr::new(IpAddr::V4(target), 0));
        socket.send_to(&packet, &dest).map_err(ScanError::from_io)?;

        match tokio::time::timeout(timeout, wait_for_reply(&socket, target, self.identifier, sequence)).await {
            Ok(result) => result,
            Err(_) => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl LivenessProbe for IcmpPinger {
    async fn echo(&self, target: IpAddr, timeout: Duration) -> ScanResult<bool> {
        match target {
            IpAddr::V4(ipv4) => self.ping(ipv4, timeout).await,
            IpAddr::V6(_) => self.ipv6.echo(target, timeout).await,
        }
    }

    fn method_name(&self) -> &str {
        "icmp-echo"
    }
}

fn open_raw_socket() -> crate::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            ScanError::PermissionError("Permission denied for ICMP socket".to_string())
        } else {
            ScanError::from_io(e)
        }
    })?;

    socket.set_nonblocking(true).map_err(ScanError::from_io)?;
    Ok(socket)
}

/// Build an ICMP echo request with a valid checksum
fn build_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
    let mut buffer = vec![0u8; ECHO_PACKET_LEN];

    if let Some(mut echo) = MutableEchoRequestPacket::new(&mut buffer) {
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(ECHO_PAYLOAD);
    }

    let checksum = IcmpPacket::new(&buffer)
        .map(|packet| icmp::checksum(&packet))
        .unwrap_or_default();
    buffer[2..4].copy_from_slice(&checksum.to_be_bytes());

    buffer
}

async fn wait_for_reply(
    socket: &Socket,
    target: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> ScanResult<bool> {
    let mut reader = socket;
    let mut buffer = [0u8; 1500];

    loop {
        match reader.read(&mut buffer) {
            Ok(received) => {
                if is_matching_reply(&buffer[..received], target, identifier, sequence) {
                    return Ok(true);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ScanError::from_io(e)),
        }
    }
}

/// Raw ICMP sockets deliver the full IPv4 datagram
fn is_matching_reply(datagram: &[u8], target: Ipv4Addr, identifier: u16, sequence: u16) -> bool {
    let ip_packet = match Ipv4Packet::new(datagram) {
        Some(packet) => packet,
        None => return false,
    };

    if ip_packet.get_next_level_protocol() != IpNextHeaderProtocols::Icmp
        || ip_packet.get_source() != target
    {
        return false;
    }

    let offset = ip_packet.get_header_length() as usize * 4;
    if offset < 20 || datagram.len() < offset {
        return false;
    }

    match EchoReplyPacket::new(&datagram[offset..]) {
        Some(reply) => {
            reply.get_icmp_type() == IcmpTypes::EchoReply
                && reply.get_identifier() == identifier
                && reply.get_sequence_number() == sequence
        }
        None => false,
    }
}
