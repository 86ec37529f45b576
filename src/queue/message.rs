use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

const FORMAT_LINE: &str = "FTMSG/1.0";

static HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w-]+):\s*(.*?)\s*$").expect("valid header regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("message has no header/body separator")]
    MissingSeparator,
}

/// A queue message: headers plus a text body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Message {
    pub fn new(headers: BTreeMap<String, String>, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Parse a raw record in `FTMSG/1.0` framing. Lines that don't look like
    /// `Name: value` (including the format line) are ignored.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let (head, body) = raw
            .split_once("\r\n\r\n")
            .or_else(|| raw.split_once("\n\n"))
            .ok_or(FrameError::MissingSeparator)?;
        let headers = head
            .lines()
            .filter_map(|line| HEADER_LINE.captures(line))
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        Ok(Self {
            headers,
            body: body.trim().to_string(),
        })
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        out.push_str(FORMAT_LINE);
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }
}
