//! Interrupt handling of the `jester` binary while a request is stalled.
//!
//! A game that accepts connections but never replies keeps the session
//! blocked; SIGINT must still end the process with status 130.
#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

const EXIT_DEADLINE: Duration = Duration::from_secs(3);

/// Accepts every connection, records its request line and never answers.
struct StalledGame {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StalledGame {
    fn spawn() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let port = listener.local_addr()?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            let mut held: Vec<TcpStream> = Vec::new();
            for stream in listener.incoming().flatten() {
                let mut line = String::new();
                if let Ok(reader) = stream.try_clone() {
                    let _ = BufReader::new(reader).read_line(&mut line);
                }
                recorded
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(line.trim_end().to_owned());
                held.push(stream);
            }
        });
        Ok(Self { port, requests })
    }

    fn endpoint(&self) -> String {
        format!("tcp://127.0.0.1:{}", self.port)
    }

    fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn wait_for_requests(&self, count: usize) -> Result<()> {
        let deadline = Instant::now() + EXIT_DEADLINE;
        while self.requests().len() < count {
            if Instant::now() >= deadline {
                bail!("expected {count} requests, saw {:?}", self.requests());
            }
            thread::sleep(Duration::from_millis(20));
        }
        Ok(())
    }
}

/// Kills the child if a test bails out before it has exited. Stdin stays
/// open for the session's lifetime so end of input cannot end it.
struct Session {
    child: Child,
    _stdin: ChildStdin,
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn start_stalled_session(game: &StalledGame) -> Result<Session> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jester"))
        .args(["--game-endpoint", &game.endpoint(), "--no-launch"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn jester")?;
    let mut stdin = child.stdin.take().context("jester stdin")?;
    stdin.write_all(b"get_game_state\n")?;
    stdin.flush()?;
    let session = Session {
        child,
        _stdin: stdin,
    };
    game.wait_for_requests(1)?;
    Ok(session)
}

fn interrupt(session: &Session) -> Result<()> {
    let status = Command::new("kill")
        .args(["-INT", &session.child.id().to_string()])
        .status()
        .context("run kill")?;
    if !status.success() {
        bail!("kill failed: {status}");
    }
    Ok(())
}

fn wait_for_exit(session: &mut Session) -> Result<ExitStatus> {
    let deadline = Instant::now() + EXIT_DEADLINE;
    loop {
        if let Some(status) = session.child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            bail!("jester still running {EXIT_DEADLINE:?} after the interrupt");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn interrupt_exits_even_when_the_game_never_answers_quit() -> Result<()> {
    let game = StalledGame::spawn()?;
    let mut session = start_stalled_session(&game)?;

    interrupt(&session)?;
    let status = wait_for_exit(&mut session)?;

    assert_eq!(status.code(), Some(130));
    let requests = game.requests();
    assert!(requests[0].contains("get_game_state"), "{requests:?}");
    Ok(())
}

#[test]
fn second_interrupt_exits_immediately() -> Result<()> {
    let game = StalledGame::spawn()?;
    let mut session = start_stalled_session(&game)?;

    interrupt(&session)?;
    game.wait_for_requests(2)?;
    interrupt(&session)?;
    let started = Instant::now();
    let status = wait_for_exit(&mut session)?;

    assert_eq!(status.code(), Some(130));
    assert!(started.elapsed() < Duration::from_millis(900), "took {:?}", started.elapsed());
    assert!(game.requests()[1].contains("quit"), "{:?}", game.requests());
    Ok(())
}
