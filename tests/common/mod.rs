#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use okta_admin_core::{
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{HeaderMap, HeaderName, HeaderValue, StatusCode},
};
use parking_lot::Mutex;

/// `Date` header used by scripted responses.
pub const SERVER_DATE: &str = "Tue, 15 Nov 1994 08:12:31 GMT";
/// Epoch second of [`SERVER_DATE`].
pub const SERVER_EPOCH: i64 = 784_887_151;

pub enum Step {
	Respond(HttpResponse),
	NetworkError,
}

/// Transport replaying a fixed script and recording every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
	script: Mutex<VecDeque<Step>>,
	requests: Mutex<Vec<HttpRequest>>,
}
impl ScriptedTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn respond(&self, response: HttpResponse) -> &Self {
		self.script.lock().push_back(Step::Respond(response));

		self
	}

	pub fn fail_network(&self) -> &Self {
		self.script.lock().push_back(Step::NetworkError);

		self
	}

	pub fn requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().clone()
	}

	pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
		self.requests.lock().iter().filter(|request| request.url.path() == path).cloned().collect()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let target = request.url_without_query().to_string();

		self.requests.lock().push(request);

		let step = self.script.lock().pop_front();

		Box::pin(async move {
			match step {
				Some(Step::Respond(response)) => Ok(response),
				Some(Step::NetworkError) => Err(TransportError::network(
					target,
					std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
				)),
				None => Err(TransportError::request(
					target,
					std::io::Error::other("script exhausted"),
				)),
			}
		})
	}
}

pub fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
	let mut map = HeaderMap::new();

	for (name, value) in headers {
		map.insert(
			HeaderName::from_bytes(name.as_bytes()).expect("Scripted header name should be valid."),
			HeaderValue::from_str(value).expect("Scripted header value should be valid."),
		);
	}

	HttpResponse::new(
		StatusCode::from_u16(status).expect("Scripted status should be valid."),
		map,
		body.as_bytes().to_vec(),
	)
}

pub fn json(status: u16, body: &str) -> HttpResponse {
	response(status, &[("content-type", "application/json")], body)
}

/// Successful GET carrying quota headers whose window resets `reset_in` seconds after
/// [`SERVER_DATE`].
pub fn quota(body: &str, remaining: i64, reset_in: i64) -> HttpResponse {
	let remaining = remaining.to_string();
	let reset = (SERVER_EPOCH + reset_in).to_string();

	response(
		200,
		&[
			("content-type", "application/json"),
			("date", SERVER_DATE),
			("x-rate-limit-limit", "600"),
			("x-rate-limit-remaining", &remaining),
			("x-rate-limit-reset", &reset),
		],
		body,
	)
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
	request.headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn form_field(request: &HttpRequest, field: &str) -> Option<String> {
	let body = request.body.as_deref().unwrap_or_default();

	okta_admin_core::url::form_urlencoded::parse(body)
		.find(|(name, _)| name == field)
		.map(|(_, value)| value.into_owned())
}

/// Decodes the claims segment of a compact JWS.
pub fn jws_claims(token: &str) -> serde_json::Value {
	jws_segment(token, 1)
}

/// Decodes the header segment of a compact JWS.
pub fn jws_header(token: &str) -> serde_json::Value {
	jws_segment(token, 0)
}

fn jws_segment(token: &str, index: usize) -> serde_json::Value {
	let segment = token.split('.').nth(index).expect("JWS should have three segments.");
	let bytes = URL_SAFE_NO_PAD.decode(segment).expect("JWS segment should be base64url.");

	serde_json::from_slice(&bytes).expect("JWS segment should be JSON.")
}
