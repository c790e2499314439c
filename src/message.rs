use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::correlation::CorrelationId;
use crate::error::Error;

/// Header names shared with the responding side
pub mod header {
    pub const METHOD: &str = "Request-Method";
    pub const PATH: &str = "Request-Path";
    pub const STATUS: &str = "Status-Code";
}

/// Method is the logical request verb carried in the method header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Wire form, the upper-cased verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

/// Request is a single outgoing message, ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
    /// Caller headers merged with the method and path headers
    pub headers: HashMap<String, String>,
    pub routing_key: String,
    pub priority: Option<u8>,
    pub content_type: String,
    pub content_encoding: String,
    /// Seconds since the unix epoch
    pub timestamp: i64,
    pub correlation_id: CorrelationId,
    pub reply_to: String,
}

impl Request {
    /// Merge caller headers with the method and path pair.
    /// The method and path always win over caller entries with the same name.
    pub fn merge_headers(
        caller: &HashMap<String, String>,
        method: Method,
        path: &str,
    ) -> HashMap<String, String> {
        let mut headers = caller.clone();
        headers.insert(header::METHOD.to_string(), method.as_str().to_string());
        headers.insert(header::PATH.to_string(), path.to_string());
        headers
    }

    /// Build the message a responder sends back for this request
    pub fn reply(&self, status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Message {
        let mut headers = headers;
        headers.insert(header::STATUS.to_string(), status.to_string());

        Message {
            correlation_id: Some(self.correlation_id.to_string()),
            headers,
            body,
        }
    }
}

/// Message is a delivery received on a reply destination
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub correlation_id: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Message {
    /// Status from the status header, if present and numeric
    pub fn status(&self) -> Option<u16> {
        self.headers
            .get(header::STATUS)
            .and_then(|s| s.trim().parse().ok())
    }
}

/// Response to a completed call
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// None when the responder did not send a usable status
    pub status: Option<u16>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn succeeded(&self) -> bool {
        match self.status {
            Some(s) => (200..300).contains(&s),
            None => false,
        }
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    /// Body as text, if it is valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl From<Message> for Response {
    fn from(m: Message) -> Self {
        Response {
            status: m.status(),
            headers: m.headers,
            body: m.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!("put".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);

        match "PATCH".parse::<Method>() {
            Err(Error::UnknownMethod(m)) => assert_eq!(m, "PATCH"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_method_and_path_headers_win() {
        let mut caller = HashMap::new();
        caller.insert(header::METHOD.to_string(), "DELETE".to_string());
        caller.insert(header::PATH.to_string(), "/admin".to_string());
        caller.insert("X-Trace".to_string(), "abc".to_string());

        let headers = Request::merge_headers(&caller, Method::Get, "/orders/42");

        assert_eq!(headers[header::METHOD], "GET");
        assert_eq!(headers[header::PATH], "/orders/42");
        assert_eq!(headers["X-Trace"], "abc");
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_response_without_status() {
        let m = Message {
            correlation_id: None,
            headers: HashMap::new(),
            body: b"partial".to_vec(),
        };

        let r = Response::from(m);
        assert_eq!(r.status, None);
        assert!(r.failed());
        assert_eq!(r.body_str(), Some("partial"));
    }

    #[test]
    fn test_reply_tags_request() {
        let req = Request {
            method: Method::Get,
            path: "/ping".to_string(),
            body: vec![],
            headers: HashMap::new(),
            routing_key: "svc".to_string(),
            priority: None,
            content_type: "text/plain".to_string(),
            content_encoding: "utf-8".to_string(),
            timestamp: 0,
            correlation_id: CorrelationId::new(),
            reply_to: "reply".to_string(),
        };

        let m = req.reply(404, HashMap::new(), b"missing".to_vec());
        assert!(req.correlation_id.matches(m.correlation_id.as_deref()));
        assert_eq!(m.status(), Some(404));

        let r = Response::from(m);
        assert!(r.failed());
        assert_eq!(r.headers[header::STATUS], "404");
    }
}
