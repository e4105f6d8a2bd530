//! Scripted stand-in for a Palworld rcon endpoint.
//!
//! The server accepts a single connection, answers the auth packet, then
//! answers each exec request with the next scripted reply. It exits once
//! the client hangs up and hands back every request it saw.
#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    thread::{self, JoinHandle},
    time::Duration,
};

#[derive(Debug, Clone)]
pub enum Reply {
    /// A well formed response frame with this body. Echoes id 0, like the
    /// real server does for commands.
    Body(Vec<u8>),
    /// Bytes written as they are.
    Raw(Vec<u8>),
    /// A well formed response frame written in two chunks, split at `at`,
    /// with a pause in between.
    Split {
        body: Vec<u8>,
        at: usize,
        pause: Duration,
    },
    /// Read the request, never answer.
    Silence,
    /// Drop the connection.
    Hangup,
}

impl Reply {
    pub fn body(text: &str) -> Self {
        Reply::Body(text.as_bytes().to_vec())
    }

    pub fn split(text: &str, at: usize) -> Self {
        Reply::Split {
            body: text.as_bytes().to_vec(),
            at,
            pause: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

pub struct MockServer {
    pub port: u16,
    handle: JoinHandle<Vec<Request>>,
}

pub fn frame(id: i32, packet_type: i32, body: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&((body.len() + 10) as i32).to_le_bytes());
    raw.extend_from_slice(&id.to_le_bytes());
    raw.extend_from_slice(&packet_type.to_le_bytes());
    raw.extend_from_slice(body);
    raw.extend_from_slice(&[0, 0]);
    raw
}

fn read_request(socket: &mut TcpStream) -> Option<Request> {
    let mut size = [0u8; 4];
    socket.read_exact(&mut size).ok()?;
    let mut rest = vec![0u8; i32::from_le_bytes(size) as usize];
    socket.read_exact(&mut rest).ok()?;

    Some(Request {
        id: i32::from_le_bytes(rest[0..4].try_into().ok()?),
        packet_type: i32::from_le_bytes(rest[4..8].try_into().ok()?),
        body: String::from_utf8_lossy(&rest[8..rest.len() - 2]).into_owned(),
    })
}

impl MockServer {
    pub fn start(password: &str, replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("should bind");
        let port = listener.local_addr().expect("should have an address").port();
        let password = password.to_string();

        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("should accept");
            let mut seen = Vec::new();

            let Some(auth) = read_request(&mut socket) else {
                return seen;
            };
            let id = if auth.body == password { auth.id } else { -1 };
            let _ = socket.write_all(&frame(id, 2, b""));
            seen.push(auth);

            let mut replies = replies.into_iter();
            while let Some(request) = read_request(&mut socket) {
                seen.push(request);
                match replies.next() {
                    Some(Reply::Body(body)) => {
                        let _ = socket.write_all(&frame(0, 0, &body));
                    }
                    Some(Reply::Split { body, at, pause }) => {
                        let bytes = frame(0, 0, &body);
                        let _ = socket.write_all(&bytes[..at]);
                        let _ = socket.flush();
                        thread::sleep(pause);
                        let _ = socket.write_all(&bytes[at..]);
                    }
                    Some(Reply::Raw(bytes)) => {
                        let _ = socket.write_all(&bytes);
                    }
                    Some(Reply::Silence) | None => {}
                    Some(Reply::Hangup) => break,
                }
            }
            seen
        });

        MockServer { port, handle }
    }

    /// Waits for the client to hang up and returns the requests received,
    /// auth packet first.
    pub fn finish(self) -> Vec<Request> {
        self.handle.join().expect("server thread panicked")
    }
}
