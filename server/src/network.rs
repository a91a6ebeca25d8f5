//! Server network layer: TCP listener and per-connection sessions

use crate::board::Board;
use crate::client_manager::ClientManager;
use crate::dispatcher::dispatch;
use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake written, no request read yet
    HandshakeSent,
    /// At least one request answered
    Ready,
    /// Terminal; entered on DISCONNECT, peer close or I/O failure
    Disconnected,
}

/// Why a session ended without an I/O error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent DISCONNECT and received the acknowledgement
    Disconnected,
    /// The peer closed its end of the socket
    PeerClosed,
}

/// One client's read-dispatch-write loop.
///
/// Socket reads and writes happen outside the board lock; only the dispatch
/// step touches the board.
pub struct Session {
    client_id: u32,
    state: SessionState,
    requests: u64,
}

impl Session {
    pub fn new(client_id: u32) -> Self {
        Self {
            client_id,
            state: SessionState::HandshakeSent,
            requests: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Requests answered so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Sends the handshake, then answers one request per line until the
    /// client disconnects, the peer closes, or I/O fails.
    pub async fn run<S>(&mut self, stream: S, board: &Board) -> io::Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite,
    {
        let result = self.serve(stream, board).await;
        self.state = SessionState::Disconnected;
        result
    }

    async fn serve<S>(&mut self, stream: S, board: &Board) -> io::Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite,
    {
        let (reader, mut writer) = tokio::io::split(stream);

        let mut handshake = board.config().handshake().to_string();
        handshake.push('\n');
        writer.write_all(handshake.as_bytes()).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            // Invalid UTF-8 is replaced, not fatal; the parser judges the result
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Client {} sent {:?}", self.client_id, line);
            let response = dispatch(line, board).await;
            self.state = SessionState::Ready;
            self.requests += 1;

            let mut text = response.to_string();
            text.push('\n');
            writer.write_all(text.as_bytes()).await?;
            writer.flush().await?;

            if response.ends_session() {
                return Ok(SessionEnd::Disconnected);
            }
        }

        Ok(SessionEnd::PeerClosed)
    }
}

/// TCP front end of the board
pub struct Server {
    listener: TcpListener,
    board: Arc<Board>,
    clients: Arc<RwLock<ClientManager>>,
}

impl Server {
    pub async fn bind(addr: &str, board: Board) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            board: Arc::new(board),
            clients: Arc::new(RwLock::new(ClientManager::new())),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn board(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }

    /// Number of currently connected clients
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Ids and addresses of currently connected clients
    pub async fn connected_clients(&self) -> Vec<(u32, SocketAddr)> {
        self.clients.read().await.get_client_addrs()
    }

    /// Accepts connections forever, one task per connection
    pub async fn run(&self) {
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.spawn_session(stream, addr).await,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        let board = Arc::clone(&self.board);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            let mut session = Session::new(client_id);

            match session.run(stream, &board).await {
                Ok(SessionEnd::Disconnected) => debug!("Client {} disconnected", client_id),
                Ok(SessionEnd::PeerClosed) => debug!("Client {} closed the connection", client_id),
                Err(e) => warn!("Client {} connection failed: {}", client_id, e),
            }

            let mut clients = clients.write().await;
            clients.record_requests(client_id, session.requests());
            clients.remove_client(&client_id);
        });
    }
}
