//! Crate-level integration tests driving the whole request lifecycle through
//! the public [`netengine::Engine`] API, end to end, against a scripted
//! [`Connector`] instead of a real socket.

mod support;

use std::sync::Arc;
use std::time::Duration;

use netengine::callback::recording::{Recorded, RecordingCallback};
use netengine::{Engine, InlineExecutor, PinEntry};
use support::{ScriptedResponse, TestConnector, test_config};

fn url(s: &str) -> url::Url {
	url::Url::parse(s).unwrap()
}

#[tokio::test]
async fn simple_get_delivers_response_started_read_completed_succeeded() {
	let engine = Engine::build(test_config(), TestConnector::new(vec![ScriptedResponse::ok("hello")])).unwrap();
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	let events = callback.events.lock().clone();
	assert_eq!(events, vec![Recorded::ResponseStarted, Recorded::ReadCompleted, Recorded::Succeeded]);

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn redirect_is_followed_to_a_final_success() {
	let engine = Engine::build(
		test_config(),
		TestConnector::new(vec![ScriptedResponse::redirect_to("http://127.0.0.2/"), ScriptedResponse::ok("ok")]),
	)
	.unwrap();
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	let events = callback.events.lock().clone();
	assert_eq!(
		events,
		vec![Recorded::RedirectReceived, Recorded::ResponseStarted, Recorded::ReadCompleted, Recorded::Succeeded]
	);

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn too_many_redirects_fails_the_request() {
	let mut cfg = test_config();
	cfg.max_redirects = 1;
	let engine = Engine::build(
		cfg,
		TestConnector::new(vec![
			ScriptedResponse::redirect_to("http://127.0.0.2/"),
			ScriptedResponse::redirect_to("http://127.0.0.1/"),
		]),
	)
	.unwrap();
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	let events = callback.events.lock().clone();
	assert_eq!(events.last(), Some(&Recorded::Failed));

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn cancel_before_exchange_completes_delivers_canceled() {
	let engine = Engine::build(
		test_config(),
		TestConnector::new(vec![ScriptedResponse::ok("too late")]).with_dial_delay(Duration::from_millis(80)),
	)
	.unwrap();
	let callback = Arc::new(RecordingCallback::default());
	let handle = engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(10)).await;
	handle.cancel();
	tokio::time::sleep(Duration::from_millis(150)).await;

	let events = callback.events.lock().clone();
	assert_eq!(events, vec![Recorded::Canceled]);

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn mismatched_pin_fails_the_request_before_success_is_delivered() {
	let engine = Engine::build(
		test_config(),
		TestConnector::new(vec![ScriptedResponse::ok("should not be delivered")]).with_chain_spki(vec![[0xBB; 32]]),
	)
	.unwrap();
	engine.add_pin(
		"127.0.0.1",
		PinEntry {
			spki_sha256: vec![[0xAA; 32]],
			include_subdomains: false,
			expiration: None,
		},
	);
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	let events = callback.events.lock().clone();
	assert_eq!(events, vec![Recorded::Failed]);

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn matching_pin_allows_the_request_through() {
	let engine = Engine::build(
		test_config(),
		TestConnector::new(vec![ScriptedResponse::ok("pinned ok")]).with_chain_spki(vec![[0xAA; 32]]),
	)
	.unwrap();
	engine.add_pin(
		"127.0.0.1",
		PinEntry {
			spki_sha256: vec![[0xAA; 32]],
			include_subdomains: false,
			expiration: None,
		},
	);
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	let events = callback.events.lock().clone();
	assert_eq!(events.last(), Some(&Recorded::Succeeded));

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn cache_in_memory_serves_second_request_without_a_second_exchange() {
	let mut cfg = test_config();
	cfg.cache.mode = netengine::cache::CacheMode::InMemory;
	let mut fresh = ScriptedResponse::ok("from network");
	fresh.headers.push((http::header::CACHE_CONTROL, http::HeaderValue::from_static("max-age=60")));
	// Only one scripted exchange: if the second request went to the network
	// too, `TestConnector::exchange` would error on an empty queue instead
	// of serving the cached entry.
	let engine = Engine::build(cfg, TestConnector::new(vec![fresh])).unwrap();

	let first = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), first.clone())
		.start();
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(first.events.lock().last(), Some(&Recorded::Succeeded));

	let second = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), second.clone())
		.start();
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(second.events.lock().last(), Some(&Recorded::Succeeded));

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn enable_brotli_advertises_br_in_accept_encoding() {
	let mut cfg = test_config();
	cfg.transport.enable_brotli = true;
	let connector = TestConnector::new(vec![ScriptedResponse::ok("ok")]);
	let sent_headers = connector.sent_headers_handle();
	let engine = Engine::build(cfg, connector).unwrap();
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(callback.events.lock().last(), Some(&Recorded::Succeeded));
	let headers = sent_headers.lock().last().cloned().unwrap();
	assert_eq!(headers.get(http::header::ACCEPT_ENCODING).unwrap(), "gzip, deflate, br");

	engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn default_config_does_not_advertise_brotli() {
	let cfg = test_config();
	let connector = TestConnector::new(vec![ScriptedResponse::ok("ok")]);
	let sent_headers = connector.sent_headers_handle();
	let engine = Engine::build(cfg, connector).unwrap();
	let callback = Arc::new(RecordingCallback::default());
	engine
		.new_request_builder(url("http://127.0.0.1/"), Arc::new(InlineExecutor), callback.clone())
		.start();

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(callback.events.lock().last(), Some(&Recorded::Succeeded));
	let headers = sent_headers.lock().last().cloned().unwrap();
	let advertised = headers.get(http::header::ACCEPT_ENCODING).unwrap();
	assert_eq!(advertised, "gzip, deflate");
	assert!(!advertised.to_str().unwrap().contains("br"));

	engine.shutdown().await.unwrap();
}
