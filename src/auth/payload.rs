use crate::types::{Result, UploadError};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Seek, SeekFrom};

/// Size of each read while hashing a payload
pub const CHUNK_SIZE: usize = 4096;

/// SHA-256 of an empty body
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute the hex SHA-256 of a seekable payload
///
/// The whole stream is hashed from offset 0 in `CHUNK_SIZE` reads, so the
/// payload is never held in memory at once. Afterwards the stream is put back
/// at the position it had before the call, ready to be handed to the upload.
pub fn hash_payload<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<String> {
    let original_position = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;

    let digest = digest_chunks(reader);

    // Rewind even when hashing failed; the hashing error wins
    let restored = reader.seek(SeekFrom::Start(original_position));
    let digest = digest?;
    restored?;

    Ok(digest)
}

/// Total length of a seekable payload, leaving the position untouched
pub fn payload_size<R: Seek + ?Sized>(reader: &mut R) -> Result<u64> {
    let original_position = reader.stream_position()?;
    let size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(original_position))?;
    Ok(size)
}

fn digest_chunks<R: Read + ?Sized>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if read > CHUNK_SIZE {
            return Err(UploadError::InvariantViolation(format!(
                "read returned {} bytes for a {} byte chunk",
                read, CHUNK_SIZE
            )));
        }

        hasher.update(&chunk[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
