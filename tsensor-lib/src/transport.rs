//! UDP plumbing for the fixed sensor broadcast port.

use crate::constants::{RECV_BUFFER_SIZE, SENSOR_PORT};
use crate::error::SensorError;
use bytes::Bytes;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// One UDP socket, bound either for listening or for sending. Datagrams pass
/// through uninterpreted; the codec and signature layers do the rest.
pub struct SensorSocket {
    socket: UdpSocket,
}

impl SensorSocket {
    /// Bind the wildcard address on the sensor port to receive broadcasts.
    pub async fn bind_listener() -> Result<Self, SensorError> {
        let socket = Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, SENSOR_PORT))).await?;
        info!(port = SENSOR_PORT, "Listening for sensor broadcasts");
        Ok(socket)
    }

    /// Bind an ephemeral port with broadcast enabled for sending.
    pub async fn bind_sender() -> Result<Self, SensorError> {
        let socket = Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.socket.set_broadcast(true)?;
        Ok(socket)
    }

    /// Bind an explicit address. The listener/sender constructors cover the
    /// normal cases; tests use this with loopback and port 0.
    pub async fn bind(addr: SocketAddr) -> Result<Self, SensorError> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SensorError> {
        Ok(self.socket.local_addr()?)
    }

    /// The limited-broadcast destination real sensors send to.
    pub fn default_destination() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::BROADCAST, SENSOR_PORT))
    }

    /// Fire one datagram at `dest`. No acknowledgement exists in this
    /// protocol, so a successful send says nothing about receipt.
    pub async fn send(&self, payload: &[u8], dest: SocketAddr) -> Result<(), SensorError> {
        let sent = self.socket.send_to(payload, dest).await?;
        debug!(bytes = sent, %dest, "Sent datagram");
        Ok(())
    }

    /// Wait for one datagram. Blocks indefinitely; absence of traffic is
    /// not an error.
    pub async fn recv(&self) -> Result<(Bytes, SocketAddr), SensorError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let (len, addr) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        debug!(bytes = len, %addr, "Received datagram");
        Ok((Bytes::from(buf), addr))
    }
}
