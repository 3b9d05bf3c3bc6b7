use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::MarshalError;

pub fn deflate(text: &str) -> Result<Vec<u8>, MarshalError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).map_err(MarshalError::Zlib)?;
    encoder.finish().map_err(MarshalError::Zlib)
}

pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>, MarshalError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(MarshalError::Zlib)?;
    Ok(out)
}

/// Checks the two-byte zlib header (deflate method, valid check bits).
pub fn looks_like_zlib(bytes: &[u8]) -> bool {
    match bytes {
        [cmf, flg, ..] => {
            *cmf & 0x0f == 8 && *cmf >> 4 <= 7 && (u16::from(*cmf) * 256 + u16::from(*flg)) % 31 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod zlib_tests {
    use super::*;

    #[test]
    fn deflate_output_is_recognised_and_inflates_back() {
        let text = "class Scene_Title\r\n  def main\r\n  end\r\nend\r\n";
        let packed = deflate(text).expect("deflate");
        assert!(looks_like_zlib(&packed));
        assert_eq!(inflate(&packed).expect("inflate"), text.as_bytes());
    }

    #[test]
    fn empty_text_still_produces_a_stream() {
        let packed = deflate("").expect("deflate");
        assert!(looks_like_zlib(&packed));
        assert!(inflate(&packed).expect("inflate").is_empty());
    }

    #[test]
    fn plain_text_is_not_mistaken_for_zlib() {
        assert!(!looks_like_zlib(b"p 'hello'"));
        assert!(!looks_like_zlib(b"x"));
        assert!(inflate(b"x\x9cgarbage").is_err());
    }
}
