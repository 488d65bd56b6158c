// Shared helpers for the integration tests.

use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use httptest::Server;

use hopline::{Client, ClientConfig};

/// Client over the reqwest transport with a short timeout.
#[allow(dead_code)] // Not every test file uses every helper
pub fn test_client() -> Client {
    hopline::initialization::init_client(&ClientConfig {
        timeout_seconds: 5.0,
        ..Default::default()
    })
    .expect("client should initialize")
}

/// Absolute URL for `path` on the mock server.
#[allow(dead_code)]
pub fn url(server: &Server, path: &str) -> String {
    format!("http://{}{}", server.addr(), path)
}

#[allow(dead_code)]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

#[allow(dead_code)]
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate write");
    encoder.finish().expect("deflate finish")
}
