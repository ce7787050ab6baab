use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

const CHUNK_SIZE: usize = 4096;

/// Width in characters of a rendered digest.
pub const DIGEST_WIDTH: usize = 16;

/// Content fingerprint of a file. Identity only, not collision resistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(u64);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stream `reader` to end in fixed-size chunks and finalize an XxHash64 digest.
///
/// Any read error aborts the digest; a partially consumed stream never yields one.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.write(&buffer[..n]);
    }
    Ok(Digest(hasher.finish()))
}

pub fn digest_file(path: &Path) -> io::Result<Digest> {
    digest_reader(File::open(path)?)
}
