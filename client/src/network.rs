use crate::view::BoardView;
use log::{debug, info};
use shared::{
    Ack, ErrorCode, FormatError, Handshake, NoteFilter, NoteView, PinView, Request, Status,
};
use std::io;
use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("server closed the connection")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(#[from] FormatError),

    #[error("server refused request: {code} {message}")]
    Server { code: ErrorCode, message: String },

    #[error("unexpected reply: {0}")]
    Unexpected(String),

    #[error("request must be a single line: {0:?}")]
    MultiLineRequest(String),
}

/// One framed reply: the status line plus the detail lines it announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub details: Vec<String>,
}

impl Reply {
    /// Turns an `ERROR` status into [`ClientError::Server`]
    pub fn into_result(self) -> Result<Self, ClientError> {
        match self.status {
            Status::Error { code, message } => Err(ClientError::Server { code, message }),
            _ => Ok(self),
        }
    }

    pub fn ends_session(&self) -> bool {
        self.status == Status::Ack(Ack::Disconnected)
    }

    fn expect_ack(self, expected: Ack) -> Result<(), ClientError> {
        match self.into_result()?.status {
            Status::Ack(ack) if ack == expected => Ok(()),
            other => Err(ClientError::Unexpected(other.to_string())),
        }
    }

    fn expect_details(self) -> Result<Vec<String>, ClientError> {
        let reply = self.into_result()?;
        match reply.status {
            Status::Count(_) => Ok(reply.details),
            other => Err(ClientError::Unexpected(other.to_string())),
        }
    }
}

/// A connection to a board server.
///
/// Generic over the transport so tests can script the server side.
pub struct Client<S = TcpStream> {
    lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
    handshake: Handshake,
}

impl Client<TcpStream> {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let client = Self::from_stream(stream).await?;
        info!("Connected to {}", addr);
        Ok(client)
    }
}

impl<S: AsyncRead + AsyncWrite> Client<S> {
    /// Reads and validates the three handshake lines
    pub async fn from_stream(stream: S) -> Result<Self, ClientError> {
        let (reader, writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();

        let board = next_line(&mut lines).await?;
        let note = next_line(&mut lines).await?;
        let colors = next_line(&mut lines).await?;
        let handshake = Handshake::parse(&board, &note, &colors)?;
        debug!("Handshake: {:?}", handshake);

        Ok(Self {
            lines,
            writer,
            handshake,
        })
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Sends one line and reads one framed reply.
    ///
    /// Input containing a line break is refused before anything is written.
    pub async fn send_raw(&mut self, line: &str) -> Result<Reply, ClientError> {
        let line = line.trim_end();
        if line.contains(['\n', '\r']) {
            return Err(ClientError::MultiLineRequest(line.to_string()));
        }

        let mut text = line.to_string();
        text.push('\n');
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;

        let status: Status = next_line(&mut self.lines).await?.parse()?;
        let mut details = Vec::with_capacity(status.detail_lines());
        for _ in 0..status.detail_lines() {
            details.push(next_line(&mut self.lines).await?);
        }

        Ok(Reply { status, details })
    }

    async fn send(&mut self, request: &Request) -> Result<Reply, ClientError> {
        self.send_raw(&request.to_string()).await
    }

    pub async fn post(&mut self, x: i32, y: i32, color: &str, message: &str) -> Result<(), ClientError> {
        let request = Request::Post {
            x,
            y,
            color: color.to_string(),
            message: message.to_string(),
        };
        self.send(&request).await?.expect_ack(Ack::NotePosted)
    }

    pub async fn pin(&mut self, x: i32, y: i32) -> Result<(), ClientError> {
        self.send(&Request::Pin { x, y }).await?.expect_ack(Ack::Pinned)
    }

    pub async fn unpin(&mut self, x: i32, y: i32) -> Result<(), ClientError> {
        self.send(&Request::Unpin { x, y }).await?.expect_ack(Ack::Unpinned)
    }

    pub async fn shake(&mut self) -> Result<(), ClientError> {
        self.send(&Request::Shake).await?.expect_ack(Ack::Shaken)
    }

    pub async fn clear(&mut self) -> Result<(), ClientError> {
        self.send(&Request::Clear).await?.expect_ack(Ack::Cleared)
    }

    pub async fn get(&mut self, filter: NoteFilter) -> Result<Vec<NoteView>, ClientError> {
        let details = self.send(&Request::Get(filter)).await?.expect_details()?;
        details
            .iter()
            .map(|line| line.parse::<NoteView>().map_err(ClientError::from))
            .collect()
    }

    pub async fn get_pins(&mut self) -> Result<Vec<PinView>, ClientError> {
        let details = self.send(&Request::GetPins).await?.expect_details()?;
        details
            .iter()
            .map(|line| line.parse::<PinView>().map_err(ClientError::from))
            .collect()
    }

    /// Current notes and pins together with the board configuration
    pub async fn snapshot(&mut self) -> Result<BoardView, ClientError> {
        let notes = self.get(NoteFilter::default()).await?;
        let pins = self.get_pins().await?;

        Ok(BoardView {
            handshake: self.handshake.clone(),
            notes,
            pins,
        })
    }

    pub async fn disconnect(mut self) -> Result<(), ClientError> {
        self.send(&Request::Disconnect)
            .await?
            .expect_ack(Ack::Disconnected)?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

async fn next_line<R>(lines: &mut Lines<R>) -> Result<String, ClientError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    lines.next_line().await?.ok_or(ClientError::Closed)
}
