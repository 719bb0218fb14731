use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::USER_AGENT;
use serde_json::Value;

use crate::http_client::http_client;
use crate::upload::UploadedFile;

/// Raw HTTP answer. Status handling is left to the caller so every
/// endpoint can apply its own failure rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The only way the crate talks to the network. `Err` means no HTTP answer
/// arrived at all (connect failure, timeout, broken stream).
pub trait Transport {
    fn post_multipart(
        &self,
        url: &str,
        field: &str,
        file: &UploadedFile,
    ) -> std::result::Result<HttpReply, String>;

    fn post_json(&self, url: &str, body: &Value) -> std::result::Result<HttpReply, String>;

    fn get(&self, url: &str) -> std::result::Result<HttpReply, String>;
}

pub struct ReqwestTransport {
    client: &'static Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    fn finish(
        resp: reqwest::Result<reqwest::blocking::Response>,
    ) -> std::result::Result<HttpReply, String> {
        let resp = resp.map_err(|err| format!("request failed: {err}"))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .map_err(|err| format!("failed reading body: {err}"))?;
        Ok(HttpReply::new(status, body.to_vec()))
    }
}

impl Transport for ReqwestTransport {
    fn post_multipart(
        &self,
        url: &str,
        field: &str,
        file: &UploadedFile,
    ) -> std::result::Result<HttpReply, String> {
        let part = Part::bytes(file.bytes().to_vec()).file_name(file.name().to_string());
        let form = Form::new().part(field.to_string(), part);
        Self::finish(
            self.client
                .post(url)
                .header(USER_AGENT, "vision_terminal")
                .multipart(form)
                .send(),
        )
    }

    fn post_json(&self, url: &str, body: &Value) -> std::result::Result<HttpReply, String> {
        Self::finish(
            self.client
                .post(url)
                .header(USER_AGENT, "vision_terminal")
                .json(body)
                .send(),
        )
    }

    fn get(&self, url: &str) -> std::result::Result<HttpReply, String> {
        Self::finish(
            self.client
                .get(url)
                .header(USER_AGENT, "vision_terminal")
                .send(),
        )
    }
}
