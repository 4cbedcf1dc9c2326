//! TCP data plane: bind the questionnaire port, receive framed payloads,
//! reliable per-peer sends with independent failure reporting.

use std::net::SocketAddr;
use std::time::Duration;

use canvass_core::{BindError, MeshEvent, PeerId, SendError, SendReport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::frame;

/// Upper bound on one reliable send (connect + write). Expiry is reported
/// as that peer's failure; there is no retry and no cancellation of other
/// sends in flight.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind the questionnaire port. An in-use port is fatal to the session.
pub async fn bind(port: u16) -> Result<TcpListener, BindError> {
    TcpListener::bind(("0.0.0.0", port)).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            BindError::PortBusy(port)
        } else {
            BindError::Io(e)
        }
    })
}

/// Accept loop. A connection may carry any number of frames; each payload
/// becomes one data-received event.
pub async fn recv_loop(
    listener: TcpListener,
    events: mpsc::UnboundedSender<MeshEvent>,
) -> std::io::Result<()> {
    loop {
        let (stream, from) = listener.accept().await?;
        let events = events.clone();
        tokio::spawn(async move {
            if let Err(e) = read_frames(stream, &events).await {
                log::debug!("connection from {from} ended: {e}");
            }
        });
    }
}

async fn read_frames(
    mut stream: TcpStream,
    events: &mpsc::UnboundedSender<MeshEvent>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        loop {
            match frame::decode_frame(&buf) {
                Ok((payload, consumed)) => {
                    buf.drain(..consumed);
                    let _ = events.send(MeshEvent::DataReceived(payload));
                }
                Err(frame::FrameDecodeError::NeedMore) => break,
                Err(e) => {
                    return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e));
                }
            }
        }
    }
}

/// One reliable send: connect, write a single frame, close. Acceptance is
/// the write completing; there is no application-level ack.
pub async fn send_reliable(addr: SocketAddr, payload: &[u8]) -> Result<(), SendError> {
    let bytes = frame::encode_frame(payload)
        .map_err(|e| SendError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let attempt = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        stream.shutdown().await?;
        Ok::<(), std::io::Error>(())
    };
    match tokio::time::timeout(SEND_TIMEOUT, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SendError::Io(e)),
        Err(_) => Err(SendError::TimedOut),
    }
}

/// Fan a payload out to every target. Each send stands alone: a failure is
/// logged and reported for that peer and the loop moves on to the next.
pub async fn fan_out(targets: &[(PeerId, Option<SocketAddr>)], payload: &[u8]) -> Vec<SendReport> {
    let mut reports = Vec::with_capacity(targets.len());
    for (peer, addr) in targets {
        let result = match addr {
            Some(addr) => send_reliable(*addr, payload).await,
            None => Err(SendError::UnknownPeer),
        };
        match &result {
            Ok(()) => log::debug!("sent {} bytes to {peer}", payload.len()),
            Err(e) => log::warn!("send to {peer} failed: {e}"),
        }
        reports.push(SendReport {
            peer: *peer,
            result,
        });
    }
    reports
}
