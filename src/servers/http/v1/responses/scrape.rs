//! `Scrape` response for the HTTP tracker.
//!
//! A bencoded dictionary mapping each resolved infohash (as its raw 20
//! bytes) to its swarm counters. Binary keys rule out a string-typed
//! serializer, so the body is written out by hand.
use std::io::Write;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::core::ScrapeData;

#[derive(Debug, PartialEq, Default)]
pub struct Bencoded {
    scrape_data: ScrapeData,
}

impl Bencoded {
    /// Returns the bencoded representation of the scrape response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();

        write!(bytes, "d5:filesd").unwrap();

        // Bencode dictionaries are sorted by raw key bytes.
        let mut files: Vec<_> = self.scrape_data.files.iter().collect();
        files.sort_by_key(|(info_hash, _)| info_hash.bytes());

        for (info_hash, metadata) in files {
            write!(bytes, "20:").unwrap();
            bytes.extend_from_slice(&info_hash.bytes());
            write!(
                bytes,
                "d8:completei{}e10:downloadedi{}e10:incompletei{}ee",
                metadata.complete, metadata.downloaded, metadata.incomplete
            )
            .unwrap();
        }

        write!(bytes, "ee").unwrap();
        bytes
    }
}

impl From<ScrapeData> for Bencoded {
    fn from(scrape_data: ScrapeData) -> Self {
        Self { scrape_data }
    }
}

impl IntoResponse for Bencoded {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}
