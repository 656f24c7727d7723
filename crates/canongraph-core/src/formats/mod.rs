//! # Formats
//!
//! Text formats at the core boundary. See [`persistence`].

pub mod persistence;

pub use persistence::{
    MAX_ARTIFACT_PAYLOAD_SIZE, artifact_from_json, artifact_from_json_limited, artifact_to_json,
    check_payload_size, manifest_from_json, query_from_json, rows_to_json,
};
