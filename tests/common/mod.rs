//! Shared fixtures: a scripted in-memory transport and canned backend responses.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use storenet::http::{Transport, TransportRequest, TransportResponse};
use storenet::plist::{self, Dictionary, Value};
use storenet::{Account, CookieSet, NetError, StoreClient, StoreConfig};

pub const DEVICE_ID: &str = "0A1B2C3D4E5F";
pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<TransportResponse, NetError>>,
    requests: Vec<TransportRequest>,
}

/// Replays queued responses in order and records every request.
/// Runs out with `NetError::ConnectionClosed`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: TransportResponse) -> &Self {
        self.script.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: NetError) -> &Self {
        self.script.lock().unwrap().responses.push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NetError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request);
        script
            .responses
            .pop_front()
            .unwrap_or(Err(NetError::ConnectionClosed))
    }
}

pub fn client(transport: &ScriptedTransport) -> StoreClient<ScriptedTransport> {
    StoreClient::builder()
        .config(StoreConfig::default())
        .transport(transport.clone())
        .build()
}

pub fn plist_response(dict: &Dictionary) -> TransportResponse {
    plist_response_with_headers(dict, &[])
}

pub fn plist_response_with_headers(dict: &Dictionary, headers: &[(&str, &str)]) -> TransportResponse {
    let raw = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    TransportResponse::new(StatusCode::OK, raw, plist::to_xml(dict))
}

pub fn redirect(location: &str) -> TransportResponse {
    TransportResponse::new(
        StatusCode::FOUND,
        vec![("Location".to_string(), location.to_string())],
        Bytes::new(),
    )
}

pub fn failure(code: &str, message: Option<&str>) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("failureType", code);
    if let Some(message) = message {
        dict.insert("customerMessage", message);
    }
    dict
}

pub fn auth_success(dsid: &str, token: &str) -> Dictionary {
    let mut address = Dictionary::new();
    address.insert("firstName", "Jane");
    address.insert("lastName", "Appleseed");

    let mut info = Dictionary::new();
    info.insert("appleId", EMAIL);
    info.insert("address", address);

    let mut dict = Dictionary::new();
    dict.insert("accountInfo", info);
    dict.insert("passwordToken", token);
    dict.insert("dsPersonId", dsid);
    dict
}

pub fn auth_response(dsid: &str, token: &str) -> TransportResponse {
    plist_response_with_headers(
        &auth_success(dsid, token),
        &[
            ("pod", "25"),
            ("x-set-apple-store-front", "143441-1,29"),
            ("Set-Cookie", "mz_at0=fresh; Path=/; Secure"),
        ],
    )
}

pub fn download_success() -> Dictionary {
    let mut metadata = Dictionary::new();
    metadata.insert("bundleDisplayName", "Example");
    metadata.insert("bundleShortVersionString", "1.4.2");
    metadata.insert("bundleVersion", "142");
    metadata.insert("passwordToken", "leaky");

    let mut sinf = Dictionary::new();
    sinf.insert("id", 0_i64);
    sinf.insert("sinf", vec![0xCA_u8, 0xFE]);

    let mut item = Dictionary::new();
    item.insert("URL", "https://iosapps.itunes.apple.com/x/app.ipa");
    item.insert("metadata", metadata);
    item.insert("sinfs", vec![Value::from(sinf)]);

    let mut dict = Dictionary::new();
    dict.insert("songList", vec![Value::from(item)]);
    dict
}

pub fn signed_in_account() -> Account {
    let mut account = Account::new(EMAIL, PASSWORD);
    account.device_identifier = DEVICE_ID.to_string();
    account.directory_services_identifier = "1000".to_string();
    account.password_token = "old-token".to_string();
    account.pod = Some("25".to_string());
    account.cookies = [("mz_at0", "stale"), ("itspod", "25")].into_iter().collect::<CookieSet>();
    account
}

pub fn body_of(request: &TransportRequest) -> Dictionary {
    plist::from_bytes(&request.body).unwrap()
}
