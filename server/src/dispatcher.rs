//! Translates request lines into board operations and results into responses.
//!
//! The dispatcher holds no state of its own. Shape errors are caught by the
//! request parser before the board is touched; domain errors come back from
//! the board untouched and are rendered with their wire code.

use crate::board::{Board, BoardError};
use log::debug;
use shared::{Ack, ErrorCode, Request, Response};

/// Parses one request line and runs it against the board
pub async fn dispatch(line: &str, board: &Board) -> Response {
    match line.parse::<Request>() {
        Ok(request) => execute(request, board).await,
        Err(e) => {
            debug!("Rejected malformed request {:?}: {}", line, e);
            Response::error(ErrorCode::InvalidFormat, e.reason)
        }
    }
}

/// Runs an already parsed request
pub async fn execute(request: Request, board: &Board) -> Response {
    let result = match request {
        Request::Disconnect => Ok(Response::Ack(Ack::Disconnected)),
        Request::Clear => {
            board.clear().await;
            Ok(Response::Ack(Ack::Cleared))
        }
        Request::Shake => {
            board.shake().await;
            Ok(Response::Ack(Ack::Shaken))
        }
        Request::Post {
            x,
            y,
            color,
            message,
        } => board
            .post(x, y, &color, &message)
            .await
            .map(|_| Response::Ack(Ack::NotePosted)),
        Request::Pin { x, y } => board.pin_at(x, y).await.map(|_| Response::Ack(Ack::Pinned)),
        Request::Unpin { x, y } => board
            .unpin_at(x, y)
            .await
            .map(|_| Response::Ack(Ack::Unpinned)),
        Request::Get(filter) => match &filter.color {
            Some(color) if !board.color_ok(color) => Err(BoardError::ColorNotSupported {
                color: color.clone(),
            }),
            _ => Ok(Response::Notes(board.get_notes(&filter).await)),
        },
        Request::GetPins => Ok(Response::Pins(board.pins_snapshot().await)),
    };

    result.unwrap_or_else(|e| {
        debug!("Request refused: {}", e);
        Response::error(e.code(), e.to_string())
    })
}
