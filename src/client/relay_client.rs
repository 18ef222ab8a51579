//! Line protocol client
//!
//! High-level API for connecting to a relay as a publisher or subscriber.

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::connection::LineReader;
use crate::error::{Error, Result};
use crate::protocol::constants::TERMINATE_SENTINEL;
use crate::protocol::{registration_line, Role};

/// A registered relay connection
///
/// # Example
/// ```no_run
/// use topic_relay::client::RelayClient;
/// use topic_relay::protocol::Role;
///
/// # async fn example() -> topic_relay::error::Result<()> {
/// let mut publisher = RelayClient::connect("127.0.0.1:5000", Role::Publisher, "weather").await?;
/// publisher.send_line("rain today").await?;
/// publisher.terminate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RelayClient {
    role: Role,
    topic: String,
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RelayClient {
    /// Connect and send the registration line
    ///
    /// The server's confirmation is not awaited; it arrives as the first
    /// line from [`next_line`](Self::next_line).
    pub async fn connect<A: ToSocketAddrs>(addr: A, role: Role, topic: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();

        let mut client = Self {
            role,
            topic: topic.to_string(),
            reader: LineReader::new(read),
            writer: write,
        };
        client.write_raw(&registration_line(role, topic)).await?;

        tracing::debug!(role = %role, topic = %topic, "Registration sent");
        Ok(client)
    }

    /// Send one line; a trailing newline is added
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.write_raw(&framed).await
    }

    /// Next line from the server, `None` once the connection is closed
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.reader.read_line().await?)
    }

    /// Ask the server to end the session and close our side
    pub async fn terminate(mut self) -> Result<()> {
        self.send_line(TERMINATE_SENTINEL).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Role this client registered with
    pub fn role(&self) -> Role {
        self.role
    }

    /// Topic this client registered on (as sent, before any server truncation)
    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn write_raw(&mut self, data: &str) -> Result<()> {
        match self.writer.write_all(data.as_bytes()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(Error::ConnectionClosed),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_sends_registration() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = LineReader::new(socket);
            let first = reader.read_line().await.unwrap();
            let second = reader.read_line().await.unwrap();
            let third = reader.read_line().await.unwrap();
            (first, second, third)
        });

        let mut client = RelayClient::connect(addr, Role::Subscriber, "sports")
            .await
            .unwrap();
        assert_eq!(client.role(), Role::Subscriber);
        assert_eq!(client.topic(), "sports");
        client.send_line("hi").await.unwrap();
        client.terminate().await.unwrap();

        let (first, second, third) = server.await.unwrap();
        assert_eq!(first.as_deref(), Some("SUBSCRIBER:sports"));
        assert_eq!(second.as_deref(), Some("hi"));
        assert_eq!(third.as_deref(), Some("terminate"));
    }

    #[tokio::test]
    async fn test_next_line_none_on_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Consume the registration so the close is a clean FIN
            let mut reader = LineReader::new(socket);
            reader.read_line().await.unwrap();
            let mut socket = reader.into_inner();
            socket.write_all(b"welcome\n").await.unwrap();
        });

        let mut client = RelayClient::connect(addr, Role::Publisher, "t").await.unwrap();
        server.await.unwrap();

        assert_eq!(client.next_line().await.unwrap().as_deref(), Some("welcome"));
        assert_eq!(client.next_line().await.unwrap(), None);
    }
}
