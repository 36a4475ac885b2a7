//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use uptime_monitor::monitoring::alert::{Alert, AlertError, AlertTransport};
use uptime_monitor::monitoring::{CheckResult, Checker, Outcome, ResultSink, Target};

async fn read_request(socket: &mut TcpStream) {
    let mut buf = [0u8; 2048];
    let _ = socket.read(&mut buf).await;
}

/// Start a mock backend answering every request with `status`.
pub async fn start_status_backend(status: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(socket);
            });
        }
    });

    addr
}

/// Start a mock backend redirecting every request to `location`.
pub async fn start_redirect_backend(location: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_redirects(listener, location);
    addr
}

/// Start a mock backend redirecting every request back to itself.
pub async fn start_redirect_loop_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_redirects(listener, format!("http://{addr}/"));
    addr
}

fn serve_redirects(listener: TcpListener, location: String) {
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let location = location.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

pub fn url_for(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub fn targets(count: usize) -> Vec<Target> {
    (0..count)
        .map(|i| Target::new(i, Url::parse(&format!("https://site{i}.example.com/")).unwrap()))
        .collect()
}

/// Checker replaying a fixed outcome sequence per target.
///
/// Cancels `done` once every script has been consumed, so a continuous run
/// stops right after the last scripted check.
pub struct ScriptedChecker {
    scripts: Vec<Vec<Outcome>>,
    cursors: Mutex<Vec<usize>>,
    delay: Duration,
    done: Option<CancellationToken>,
}

impl ScriptedChecker {
    pub fn new(scripts: Vec<Vec<Outcome>>) -> Self {
        let cursors = Mutex::new(vec![0; scripts.len()]);
        Self { scripts, cursors, delay: Duration::ZERO, done: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn cancel_when_done(mut self, token: CancellationToken) -> Self {
        self.done = Some(token);
        self
    }

    fn next_outcome(&self, target: &Target) -> Outcome {
        let mut cursors = self.cursors.lock().unwrap();
        let script = &self.scripts[target.id.0];
        let index = cursors[target.id.0].min(script.len() - 1);
        cursors[target.id.0] += 1;

        let exhausted = cursors.iter().zip(&self.scripts).all(|(cursor, script)| *cursor >= script.len());
        if exhausted {
            if let Some(token) = &self.done {
                token.cancel();
            }
        }

        script[index]
    }
}

#[async_trait::async_trait]
impl Checker for ScriptedChecker {
    async fn check(&self, target: &Target, _timeout: Duration) -> CheckResult {
        let timestamp = Local::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let code = match self.next_outcome(target) {
            Outcome::Up => 200,
            Outcome::Down => 503,
        };
        CheckResult::responded(target, timestamp, code, self.delay)
    }
}

/// Sink keeping every recorded result.
#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<CheckResult>>>);

impl RecordingSink {
    pub fn results(&self) -> Vec<CheckResult> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl ResultSink for RecordingSink {
    fn record(&mut self, result: &CheckResult) {
        self.0.lock().unwrap().push(result.clone());
    }
}

/// Alert transport keeping every delivered alert.
#[derive(Default)]
pub struct RecordingTransport {
    pub delivered: Mutex<Vec<Alert>>,
    pub fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AlertTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
        if self.fail {
            return Err(AlertError::Transport("connection refused".into()));
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Writer failing every write and flush, like a full disk
pub struct FullDisk;

impl io::Write for FullDisk {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("no space left on device"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("no space left on device"))
    }
}
