pub mod xxhash;

pub use xxhash::{digest_file, digest_reader, Digest, DIGEST_WIDTH};
