//! In-memory transport that replays a fixed script of responses

use reqwest::Url;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};

use crate::error::FetchError;
use crate::http::{HttpResponse, Transport};

enum Step {
    Respond {
        status: u16,
        location: Option<String>,
        body: Vec<u8>,
    },
    BrokenBody(Vec<u8>),
    NetworkError(String),
}

/// Body that yields a prefix and then fails like a reset connection
struct BrokenReader {
    prefix: Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.prefix.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: RefCell<VecDeque<Step>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, step: Step) -> Self {
        self.script.borrow_mut().push_back(step);
        self
    }

    pub fn ok(self, body: &[u8]) -> Self {
        self.push(Step::Respond {
            status: 200,
            location: None,
            body: body.to_vec(),
        })
    }

    pub fn status(self, status: u16) -> Self {
        self.push(Step::Respond {
            status,
            location: None,
            body: Vec::new(),
        })
    }

    pub fn redirect(self, location: &str) -> Self {
        self.push(Step::Respond {
            status: 302,
            location: Some(location.to_string()),
            body: Vec::new(),
        })
    }

    /// 200 whose body breaks after `prefix`
    pub fn broken_body(self, prefix: &[u8]) -> Self {
        self.push(Step::BrokenBody(prefix.to_vec()))
    }

    pub fn network_error(self, message: &str) -> Self {
        self.push(Step::NetworkError(message.to_string()))
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.requests.borrow_mut().push(url.to_string());

        match self.script.borrow_mut().pop_front() {
            Some(Step::Respond {
                status,
                location,
                body,
            }) => Ok(HttpResponse {
                status,
                location,
                body: Box::new(Cursor::new(body)),
            }),
            Some(Step::BrokenBody(prefix)) => Ok(HttpResponse {
                status: 200,
                location: None,
                body: Box::new(BrokenReader {
                    prefix: Cursor::new(prefix),
                }),
            }),
            Some(Step::NetworkError(message)) => Err(FetchError::network(url.as_str(), message)),
            None => Err(FetchError::network(url.as_str(), "no scripted response left")),
        }
    }
}
