//! End-to-end key exchange between a client and a server key store

mod common;

use ::common::crypto::{Integrity, KeyKind, KeyStrategy};
use ::common::transport::{Opened, TransportWrapper};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Book {
    title: String,
    author: String,
    publication_date: String,
}

fn dune() -> Book {
    Book {
        title: "Dune".to_string(),
        author: "Herbert".to_string(),
        publication_date: "1965-08-01".to_string(),
    }
}

#[test]
fn test_add_book_scenario() {
    let (server_store, client_store, _temp) = common::setup_stores(KeyStrategy::Rsa);
    let transport = TransportWrapper::default();

    let server_keys = server_store.get_or_create();
    let client_keys = client_store.get_or_create();
    assert_eq!(server_keys.kind(), KeyKind::ServerPem);
    assert_eq!(client_keys.kind(), KeyKind::OpaqueToken);

    // the client only ever sees the public half of the server pair
    let server_public = ::common::transport::parse_counterpart(server_keys.public_key()).unwrap();
    assert_eq!(server_public.kind(), KeyKind::ServerPem);

    let request = transport
        .channel(&client_keys, Some(&server_public))
        .seal_request(&dune())
        .unwrap();
    assert!(!request.to_string().contains("Herbert"));

    let opened: Opened<Book> = transport.channel(&server_keys, None).open(request).unwrap();
    assert_eq!(opened.value, dune());
    assert_eq!(opened.integrity, Some(Integrity::Unsigned));
    let client_public = opened.counterpart.expect("request carries the client key");

    let response = transport
        .channel(&server_keys, Some(&client_public))
        .seal_response(&json!({ "message": "Book added" }))
        .unwrap();

    let reply: Opened<Value> = transport.channel(&client_keys, None).open(response).unwrap();
    assert_eq!(reply.value, json!({ "message": "Book added" }));
    assert_eq!(reply.integrity, Some(Integrity::Verified));
}

#[test]
fn test_keys_survive_restart() {
    let (server_store, client_store, temp) = common::setup_stores(KeyStrategy::DerivedHash);
    let transport = TransportWrapper::default();

    let server_keys = server_store.get_or_create();
    let client_keys = client_store.get_or_create();
    let server_public = server_keys.public();

    let request = transport
        .channel(&client_keys, Some(&server_public))
        .seal_request(&dune())
        .unwrap();

    // a new process reads the same files
    let restarted = common::server_store(&temp, KeyStrategy::DerivedHash).get_or_create();
    assert_eq!(restarted, server_keys);
    assert_eq!(common::client_store(&temp).get_or_create(), client_keys);

    let opened: Opened<Book> = transport.channel(&restarted, None).open(request).unwrap();
    assert_eq!(opened.value, dune());
}

#[test]
fn test_server_rotation_breaks_old_envelopes() {
    let (server_store, client_store, _temp) = common::setup_stores(KeyStrategy::Rsa);
    let transport = TransportWrapper::default();

    let old = server_store.get_or_create();
    let client_keys = client_store.get_or_create();
    let old_public = old.public();

    let request = transport
        .channel(&client_keys, Some(&old_public))
        .seal_request(&dune())
        .unwrap();

    let rotated = server_store.regenerate();
    assert_ne!(rotated.public_key(), old.public_key());
    assert!(transport
        .channel(&rotated, None)
        .open::<Book>(request)
        .is_err());
}
