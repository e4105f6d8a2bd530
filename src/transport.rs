//! Raw TCP sessions. These only move bytes; framing and retries are the
//! engine's business.
use std::{
    future::Future,
    io::{self, Read, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

use log::{debug, trace};
use tokio::{io::AsyncWriteExt, net::TcpStream};

use crate::error::{RconError, Result};

/// Async session on top of a tokio [TcpStream].
pub struct Transport {
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
}

impl Transport {
    pub async fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let stream = within(timeout, TcpStream::connect((host, port)))
            .await?
            .map_err(RconError::from_connect)?;
        trace!("opened tcp stream to {}:{}", host, port);

        Ok(Transport {
            stream: Some(stream),
            timeout,
        })
    }

    /// Writes the whole buffer.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_ref().ok_or(RconError::NotConnected)?;
        within(self.timeout, write_to_stream(stream, bytes)).await?
    }

    /// One read of at most `max_bytes`. Returns whatever arrived.
    pub async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_ref().ok_or(RconError::NotConnected)?;
        let mut buf = vec![0; max_bytes];
        let read = within(self.timeout, read_from_stream(stream, &mut buf)).await??;
        buf.truncate(read);
        Ok(buf)
    }

    /// Reads until exactly `len` bytes arrived. The timeout applies to
    /// each read, not to the whole buffer.
    pub async fn receive_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_ref().ok_or(RconError::NotConnected)?;
        let mut buf = vec![0; len];
        let mut filled = 0;
        while filled < len {
            filled += within(self.timeout, read_from_stream(stream, &mut buf[filled..])).await??;
        }
        Ok(buf)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Shuts the socket down. Calling it again does nothing.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.shutdown().await {
                debug!("error while shutting down tcp stream: {}", err);
            }
        }
    }
}

async fn within<F: Future>(timeout: Option<Duration>, future: F) -> Result<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| RconError::TimeoutError),
        None => Ok(future.await),
    }
}

async fn write_to_stream(stream: &TcpStream, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        stream.writable().await.map_err(RconError::from_send)?;

        match stream.try_write(bytes) {
            Ok(0) => return Err(RconError::ConnectionClosed),
            Ok(written) => bytes = &bytes[written..],
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(RconError::from_send(e)),
        }
    }
    Ok(())
}

async fn read_from_stream(stream: &TcpStream, buf: &mut [u8]) -> Result<usize> {
    loop {
        stream.readable().await.map_err(RconError::from_receive)?;

        match stream.try_read(buf) {
            Ok(0) if !buf.is_empty() => return Err(RconError::ConnectionClosed),
            Ok(read) => return Ok(read),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(RconError::from_receive(e)),
        }
    }
}

/// Blocking session on top of a [std::net::TcpStream]. The timeout is
/// applied as the socket's read and write timeout.
#[derive(Debug)]
pub struct BlockingTransport {
    stream: Option<std::net::TcpStream>,
}

impl BlockingTransport {
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let mut last_err = None;

        for addr in (host, port)
            .to_socket_addrs()
            .map_err(RconError::UnreachableHost)?
        {
            let attempt = match timeout {
                Some(limit) => std::net::TcpStream::connect_timeout(&addr, limit),
                None => std::net::TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream
                        .set_read_timeout(timeout)
                        .and_then(|_| stream.set_write_timeout(timeout))
                        .map_err(RconError::UnreachableHost)?;
                    trace!("opened tcp stream to {}", addr);
                    return Ok(BlockingTransport {
                        stream: Some(stream),
                    });
                }
                Err(err) => {
                    trace!("cannot connect to {}: {}", addr, err);
                    last_err = Some(err);
                }
            }
        }

        Err(RconError::from_connect(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        })))
    }

    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;
        stream.write_all(bytes).map_err(RconError::from_send)
    }

    pub fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;
        let mut buf = vec![0; max_bytes];
        let read = stream.read(&mut buf).map_err(RconError::from_receive)?;
        if read == 0 && max_bytes > 0 {
            return Err(RconError::ConnectionClosed);
        }
        buf.truncate(read);
        Ok(buf)
    }

    pub fn receive_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;
        let mut buf = vec![0; len];
        stream
            .read_exact(&mut buf)
            .map_err(RconError::from_receive)?;
        Ok(buf)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::NotConnected => {}
                Err(err) => debug!("error while shutting down tcp stream: {}", err),
            }
        }
    }
}
