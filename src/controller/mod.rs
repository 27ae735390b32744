use crate::config::ConnectionConfig;
use serde_json::Value;
use std::io::{self, BufRead, BufReader};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const MIN_CONNECT_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum ControllerError
{
    #[error("no controller address could be resolved")]
    NoCandidates,
    #[error("no controller answered after {attempts} attempt(s) on {tried}")]
    Unreachable { attempts: u32, tried: String },
    #[error("failed to start the controller reader: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug)]
pub enum LinkEvent
{
    Frame(Value),
    Disconnected(String),
    Reconnected(SocketAddr),
}

/// Link to the ESP32 bridge: one JSON frame per line over TCP.
///
/// A reader thread parses lines and hands them to the main loop over a
/// channel; the main loop never blocks on the socket.
pub struct Controller
{
    addr: SocketAddr,
    events: Receiver<LinkEvent>,
}

impl Controller
{
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ControllerError>
    {
        let candidates = candidates(config);
        if candidates.is_empty() {
            return Err(ControllerError::NoCandidates);
        }
        let (addr, stream) = dial(&candidates, config)?;
        log::info!("controller connected at {addr}");

        let (sender, events) = mpsc::channel();
        let link_config = config.clone();
        thread::Builder::new()
            .name("controller-link".to_string())
            .spawn(move || run_link(stream, addr, sender, &link_config))?;

        Ok(Self { addr, events })
    }

    pub fn address(&self) -> SocketAddr
    {
        self.addr
    }

    /// Everything received since the last call, without blocking.
    pub fn poll(&self) -> Vec<LinkEvent>
    {
        self.events.try_iter().collect()
    }
}

fn candidates(config: &ConnectionConfig) -> Vec<SocketAddr>
{
    let mut addrs = Vec::new();
    for host in &config.common_ips {
        match (host.as_str(), config.port).to_socket_addrs() {
            Ok(resolved) => addrs.extend(resolved),
            Err(err) => log::warn!("cannot resolve controller host {host}: {err}"),
        }
    }
    addrs
}

fn dial(
    candidates: &[SocketAddr],
    config: &ConnectionConfig,
) -> Result<(SocketAddr, TcpStream), ControllerError>
{
    let attempts = config.max_retry_attempts.max(1);
    let timeout = config.timeout().max(MIN_CONNECT_TIMEOUT);
    for attempt in 1..=attempts {
        for addr in candidates {
            match open(addr, timeout) {
                Ok(stream) => return Ok((*addr, stream)),
                Err(err) => log::debug!("attempt {attempt}: {addr} unavailable: {err}"),
            }
        }
        if attempt < attempts {
            thread::sleep(config.retry_delay());
        }
    }

    let tried = candidates
        .iter()
        .map(SocketAddr::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(ControllerError::Unreachable { attempts, tried })
}

fn open(addr: &SocketAddr, timeout: Duration) -> io::Result<TcpStream>
{
    let stream = TcpStream::connect_timeout(addr, timeout)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(None)?;
    Ok(stream)
}

fn run_link(
    mut stream: TcpStream,
    addr: SocketAddr,
    sender: Sender<LinkEvent>,
    config: &ConnectionConfig,
)
{
    loop {
        let reason = match read_frames(&stream, addr, &sender) {
            Ok(ReadEnd::ReceiverGone) => return,
            Ok(ReadEnd::Closed) => "connection closed".to_string(),
            Err(err) => err.to_string(),
        };
        log::warn!("controller at {addr} disconnected: {reason}");
        if sender.send(LinkEvent::Disconnected(reason)).is_err() || !config.auto_reconnect {
            return;
        }

        thread::sleep(config.retry_delay());
        match dial(&[addr], config) {
            Ok((_, reconnected)) => {
                log::info!("controller reconnected at {addr}");
                stream = reconnected;
                if sender.send(LinkEvent::Reconnected(addr)).is_err() {
                    return;
                }
            }
            Err(err) => {
                log::error!("giving up on controller: {err}");
                return;
            }
        }
    }
}

enum ReadEnd
{
    Closed,
    ReceiverGone,
}

fn read_frames(stream: &TcpStream, addr: SocketAddr, sender: &Sender<LinkEvent>) -> io::Result<ReadEnd>
{
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                if sender.send(LinkEvent::Frame(value)).is_err() {
                    return Ok(ReadEnd::ReceiverGone);
                }
            }
            Err(err) => log::warn!("skipping non-JSON line from {addr}: {err}"),
        }
    }
    Ok(ReadEnd::Closed)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn local_config(port: u16) -> ConnectionConfig
    {
        ConnectionConfig {
            timeout_ms: 500,
            max_retry_attempts: 1,
            auto_reconnect: false,
            common_ips: vec!["127.0.0.1".to_string()],
            retry_delay_ms: 0,
            port,
        }
    }

    #[test]
    fn forwards_json_lines_and_skips_garbage()
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(b"not json\n\n").unwrap();
            socket
                .write_all(b"{\"buttons\":[true,false,false,false,false,false,false,false,false]}\n")
                .unwrap();
        });

        let controller = Controller::connect(&local_config(port)).unwrap();
        assert_eq!(controller.address().port(), port);
        server.join().unwrap();

        let first = controller.events.recv_timeout(Duration::from_secs(5)).unwrap();
        match first {
            LinkEvent::Frame(value) => assert_eq!(value["buttons"][0], Value::Bool(true)),
            other => panic!("unexpected event {other:?}"),
        }
        let second = controller.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(second, LinkEvent::Disconnected(_)));
    }

    #[test]
    fn unreachable_controller_is_reported()
    {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = Controller::connect(&local_config(port)).err().unwrap();
        assert!(matches!(err, ControllerError::Unreachable { attempts: 1, .. }));
    }

    #[test]
    fn empty_candidate_list_is_an_error()
    {
        let config = ConnectionConfig {
            common_ips: Vec::new(),
            ..local_config(1)
        };
        assert!(matches!(
            Controller::connect(&config),
            Err(ControllerError::NoCandidates)
        ));
    }
}
