#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use vision_terminal::transport::{HttpReply, Transport};
use vision_terminal::upload::UploadedFile;

pub const ORIGIN: &str = "http://api.test:8000";

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn clip() -> UploadedFile {
    UploadedFile::new("match.mp4", b"\x00\x00\x00\x18ftypmp42".to_vec())
}

pub fn ok_json(body: &str) -> Result<HttpReply, String> {
    Ok(HttpReply::new(200, body.as_bytes().to_vec()))
}

pub fn status(code: u16, body: &str) -> Result<HttpReply, String> {
    Ok(HttpReply::new(code, body.as_bytes().to_vec()))
}

pub fn unreachable() -> Result<HttpReply, String> {
    Err("request failed: connection refused".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub field: Option<String>,
    pub json: Option<Value>,
}

/// Answers requests from a queue, in order, and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpReply, String>>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<HttpReply, String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.url.clone()).collect()
    }

    fn next(&self, call: Call) -> Result<HttpReply, String> {
        self.calls.borrow_mut().push(call);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply".to_string()))
    }
}

impl Transport for ScriptedTransport {
    fn post_multipart(
        &self,
        url: &str,
        field: &str,
        _file: &UploadedFile,
    ) -> Result<HttpReply, String> {
        self.next(Call {
            method: "POST",
            url: url.to_string(),
            field: Some(field.to_string()),
            json: None,
        })
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, String> {
        self.next(Call {
            method: "POST",
            url: url.to_string(),
            field: None,
            json: Some(body.clone()),
        })
    }

    fn get(&self, url: &str) -> Result<HttpReply, String> {
        self.next(Call {
            method: "GET",
            url: url.to_string(),
            field: None,
            json: None,
        })
    }
}
