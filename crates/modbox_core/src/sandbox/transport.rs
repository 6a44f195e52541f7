//! Request transport handles handed out by `Sandbox::open_connection`.
//!
//! # Invariants
//! - Only `get` and `post` (lowercase) are accepted verbs.
//! - A connection is opened by the core but never sent by it.
//! - A connection can be sent at most once.

use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use uuid::Uuid;

/// Supported request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Parses a mode string; matching is case-sensitive.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
        }
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    AlreadySent(Uuid),
    BodyNotAllowed(HttpMethod),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySent(id) => write!(f, "connection already sent: {id}"),
            Self::BodyNotAllowed(method) => {
                write!(f, "request body is not allowed for `{}`", method.as_str())
            }
        }
    }
}

impl Error for TransportError {}

/// One opened request.
pub trait Connection {
    fn id(&self) -> Uuid;
    fn method(&self) -> HttpMethod;
    fn href(&self) -> &str;
    fn is_sent(&self) -> bool;
    fn send(&mut self, body: Option<String>) -> Result<(), TransportError>;
}

/// Factory for opened connections.
pub trait Transport {
    fn open(&self, method: HttpMethod, href: &str) -> Box<dyn Connection>;
}

/// Request captured by [`LoopbackTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub id: Uuid,
    pub method: HttpMethod,
    pub href: String,
    pub body: Option<String>,
}

/// In-process transport that records every sent request.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    sent: Rc<RefCell<Vec<SentRequest>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.borrow().clone()
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, method: HttpMethod, href: &str) -> Box<dyn Connection> {
        Box::new(LoopbackConnection {
            id: Uuid::new_v4(),
            method,
            href: href.to_string(),
            sent: false,
            log: Rc::clone(&self.sent),
        })
    }
}

struct LoopbackConnection {
    id: Uuid,
    method: HttpMethod,
    href: String,
    sent: bool,
    log: Rc<RefCell<Vec<SentRequest>>>,
}

impl Connection for LoopbackConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn is_sent(&self) -> bool {
        self.sent
    }

    fn send(&mut self, body: Option<String>) -> Result<(), TransportError> {
        if self.sent {
            return Err(TransportError::AlreadySent(self.id));
        }
        if self.method == HttpMethod::Get && body.is_some() {
            return Err(TransportError::BodyNotAllowed(self.method));
        }
        self.sent = true;
        self.log.borrow_mut().push(SentRequest {
            id: self.id,
            method: self.method,
            href: self.href.clone(),
            body,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpMethod, LoopbackTransport, Transport, TransportError};

    #[test]
    fn parses_lowercase_verbs_only() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("GET"), None);
        assert_eq!(HttpMethod::parse("Post"), None);
        assert_eq!(HttpMethod::parse("put"), None);
    }

    #[test]
    fn opened_connection_is_not_sent_until_caller_sends() {
        let transport = LoopbackTransport::new();
        let mut connection = transport.open(HttpMethod::Post, "/api/items");
        assert!(!connection.is_sent());
        assert!(transport.sent().is_empty());

        connection
            .send(Some("{\"name\":\"x\"}".to_string()))
            .expect("first send");
        assert!(connection.is_sent());

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].href, "/api/items");
        assert_eq!(sent[0].id, connection.id());
    }

    #[test]
    fn rejects_second_send_and_get_body() {
        let transport = LoopbackTransport::new();
        let mut connection = transport.open(HttpMethod::Get, "/status");
        let err = connection
            .send(Some("body".to_string()))
            .expect_err("get with body must fail");
        assert_eq!(err, TransportError::BodyNotAllowed(HttpMethod::Get));

        connection.send(None).expect("plain get");
        let err = connection.send(None).expect_err("second send must fail");
        assert!(matches!(err, TransportError::AlreadySent(_)));
    }
}
