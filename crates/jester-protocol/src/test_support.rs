//! In-process fake of the game's scripting server.
//!
//! The fake accepts one connection per scripted [`Reply`], records the
//! request line, writes the reply bytes (optionally in delayed chunks) and
//! closes the connection, mirroring the one-exchange-per-connection model of
//! the real server.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use jester_config::GameEndpoint;
use serde_json::Value;

use crate::frame::write_frame;

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);
const ACCEPT_POLL: Duration = Duration::from_millis(10);
const LOOPBACK: &str = "127.0.0.1";

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Reply {
    payload: Vec<u8>,
    framed: bool,
    chunk_len: Option<usize>,
    pause: Duration,
}

impl Reply {
    /// A framed JSON payload.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::framed(value.to_string().into_bytes())
    }

    /// A framed plain-text payload.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::framed(text.as_bytes().to_vec())
    }

    /// Bytes written exactly as given, without a length prefix.
    #[must_use]
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: bytes.into(),
            framed: false,
            chunk_len: None,
            pause: Duration::ZERO,
        }
    }

    /// Waits for `pause` and closes without writing anything.
    #[must_use]
    pub fn silence(pause: Duration) -> Self {
        Self {
            pause,
            ..Self::raw(Vec::new())
        }
    }

    /// Splits the written bytes into `chunk_len` pieces separated by `pause`.
    #[must_use]
    pub fn in_chunks(mut self, chunk_len: usize, pause: Duration) -> Self {
        self.chunk_len = Some(chunk_len.max(1));
        self.pause = pause;
        self
    }

    fn framed(payload: Vec<u8>) -> Self {
        Self {
            framed: true,
            ..Self::raw(payload)
        }
    }

    fn wire_bytes(&self) -> io::Result<Vec<u8>> {
        if !self.framed {
            return Ok(self.payload.clone());
        }
        let mut bytes = Vec::with_capacity(self.payload.len() + 4);
        write_frame(&mut bytes, &self.payload)?;
        Ok(bytes)
    }
}

/// A fake game server listening on an ephemeral loopback port.
pub struct FakeGame {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<io::Result<()>>>,
}

impl FakeGame {
    /// Starts serving `replies`, one connection each, in order.
    ///
    /// # Errors
    ///
    /// Fails when the listener cannot be bound.
    pub fn spawn(replies: Vec<Reply>) -> io::Result<Self> {
        let listener = TcpListener::bind((LOOPBACK, 0))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || serve(&listener, &replies, &recorded));
        Ok(Self {
            port,
            requests,
            handle: Some(handle),
        })
    }

    /// Endpoint clients should connect to.
    #[must_use]
    pub fn endpoint(&self) -> GameEndpoint {
        GameEndpoint::new(LOOPBACK, self.port)
    }

    /// Waits for the server to finish and returns the request lines it
    /// received, without their trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the server thread's IO failure, if any.
    pub fn finish(&mut self) -> io::Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| io::Error::other("fake game thread panicked"))??;
        }
        Ok(self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

impl Drop for FakeGame {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

/// Returns a loopback endpoint with no listener behind it.
///
/// # Errors
///
/// Fails when a temporary listener cannot be bound.
pub fn unused_endpoint() -> io::Result<GameEndpoint> {
    let listener = TcpListener::bind((LOOPBACK, 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(GameEndpoint::new(LOOPBACK, port))
}

fn serve(listener: &TcpListener, replies: &[Reply], requests: &Mutex<Vec<String>>) -> io::Result<()> {
    for reply in replies {
        let Some(stream) = accept_before_deadline(listener)? else {
            // The client gave up before connecting; nothing more to serve.
            return Ok(());
        };
        stream.set_nonblocking(false)?;
        record_request(&stream, requests)?;
        respond(stream, reply)?;
    }
    Ok(())
}

fn accept_before_deadline(listener: &TcpListener) -> io::Result<Option<TcpStream>> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(error) => return Err(error),
        }
    }
}

fn record_request(stream: &TcpStream, requests: &Mutex<Vec<String>>) -> io::Result<()> {
    let mut line = String::new();
    let mut reader = BufReader::new(stream.try_clone()?);
    if reader.read_line(&mut line)? == 0 {
        return Ok(());
    }
    requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(line.trim_end_matches('\n').to_owned());
    Ok(())
}

fn respond(mut stream: TcpStream, reply: &Reply) -> io::Result<()> {
    let bytes = reply.wire_bytes()?;
    match reply.chunk_len {
        Some(chunk_len) => {
            for chunk in bytes.chunks(chunk_len) {
                stream.write_all(chunk)?;
                stream.flush()?;
                thread::sleep(reply.pause);
            }
        }
        None => {
            thread::sleep(reply.pause);
            stream.write_all(&bytes)?;
            stream.flush()?;
        }
    }
    Ok(())
}
