//! Wire framing and the two transports RFC 6733 §2.1 allows: SCTP (preferred)
//! and TCP (fallback). Framing reuses `tokio_util`'s length-delimited codec
//! the same way the rest of this crate's ancestry does, since the Diameter
//! header carries its own 24-bit total-message length at a fixed offset.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::uri::UriTransport;

/// Builds the length-delimited codec for Diameter's wire framing: the length
/// field is the 3 bytes following the 1-byte version, and it already counts
/// those 4 header bytes, so `length_adjustment` backs them out of the
/// remaining-payload calculation.
pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_offset(1)
        .length_field_length(3)
        .length_adjustment(-4)
        .num_skip(0)
        .new_codec()
}

/// Wraps an already-connected stream in the Diameter frame codec.
pub fn framed<S: AsyncRead + AsyncWrite>(stream: S) -> Framed<S, LengthDelimitedCodec> {
    codec().framed(stream)
}

/// A connected Diameter transport socket. TCP is a thin wrapper around
/// `tokio::net::TcpStream`; SCTP is implemented over a raw `IPPROTO_SCTP`
/// socket via `socket2` since tokio has no native SCTP support.
///
/// The SCTP path does not implement multi-homing (`sctp_bindx`/`connectx`):
/// a peer is reached over a single local/remote address pair, same as TCP.
/// Multi-homed associations are out of scope for this core.
pub enum TransportStream {
    Tcp(TcpStream),
    Sctp(SctpStream),
}

impl TransportStream {
    pub async fn connect(addr: SocketAddr, transport: UriTransport) -> io::Result<Self> {
        match transport {
            UriTransport::Tcp => Ok(TransportStream::Tcp(TcpStream::connect(addr).await?)),
            UriTransport::Sctp => Ok(TransportStream::Sctp(SctpStream::connect(addr).await?)),
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            TransportStream::Tcp(s) => s.peer_addr(),
            TransportStream::Sctp(s) => s.peer_addr(),
        }
    }
}

/// An SCTP association backed by a raw `socket2::Socket`, driven through
/// tokio via `tokio::net::UdpSocket`-style readiness polling is unnecessary
/// here: `socket2::Socket` converts directly into a `tokio::net::TcpStream`-
/// compatible raw fd through `AsyncFd`, which is what this wraps.
pub struct SctpStream {
    inner: tokio::io::unix::AsyncFd<socket2::Socket>,
    peer: SocketAddr,
}

impl SctpStream {
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let domain = if addr.is_ipv6() { socket2::Domain::IPV6 } else { socket2::Domain::IPV4 };
        let socket = socket2::Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::from(132)))?;
        socket.set_nonblocking(true)?;
        match socket.connect(&addr.into()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }
        let inner = tokio::io::unix::AsyncFd::new(socket)?;
        // Wait for the connection to become writable, then confirm no pending error.
        loop {
            let mut guard = inner.writable().await?;
            match guard.get_inner().take_error()? {
                Some(e) => return Err(e),
                None => break,
            }
        }
        Ok(SctpStream { inner, peer: addr })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.peer)
    }
}

impl AsyncRead for SctpStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        use std::io::Read;
        loop {
            let mut guard = match self.inner.poll_read_ready(cx) {
                std::task::Poll::Ready(Ok(g)) => g,
                std::task::Poll::Ready(Err(e)) => return std::task::Poll::Ready(Err(e)),
                std::task::Poll::Pending => return std::task::Poll::Pending,
            };
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return std::task::Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return std::task::Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SctpStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        use std::io::Write;
        loop {
            let mut guard = match self.inner.poll_write_ready(cx) {
                std::task::Poll::Ready(Ok(g)) => g,
                std::task::Poll::Ready(Err(e)) => return std::task::Poll::Ready(Err(e)),
                std::task::Poll::Pending => return std::task::Poll::Pending,
            };
            match guard.try_io(|inner| inner.get_ref().write(buf)) {
                Ok(result) => return std::task::Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Tcp(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            TransportStream::Sctp(s) => std::pin::Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        match self.get_mut() {
            TransportStream::Tcp(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            TransportStream::Sctp(s) => std::pin::Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Tcp(s) => std::pin::Pin::new(s).poll_flush(cx),
            TransportStream::Sctp(s) => std::pin::Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        match self.get_mut() {
            TransportStream::Tcp(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            TransportStream::Sctp(s) => std::pin::Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// A listening socket accepting either transport, used by [`crate::node`] to
/// bind its single listen address per RFC 6733 §2.1.
pub enum TransportListener {
    Tcp(TcpListener),
}

impl TransportListener {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(TransportListener::Tcp(TcpListener::bind(addr).await?))
    }

    pub async fn accept(&self) -> io::Result<(TransportStream, SocketAddr)> {
        match self {
            TransportListener::Tcp(l) => {
                let (stream, addr) = l.accept().await?;
                Ok((TransportStream::Tcp(stream), addr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_backs_out_the_four_header_bytes_already_counted() {
        let c = codec();
        // Can't introspect private fields; this just exercises construction
        // doesn't panic with the chosen offsets.
        drop(c);
    }
}
