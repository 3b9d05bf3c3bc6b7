use crate::value::{MarshalString, MarshalValue, StringEncoding};
use crate::{MarshalError, MARSHAL_MAJOR, MARSHAL_MINOR};

const MAX_DEPTH: usize = 64;

pub fn read_value(bytes: &[u8]) -> Result<MarshalValue, MarshalError> {
    let mut reader = Reader::new(bytes);
    reader.read_header()?;
    let value = reader.read_value(0)?;
    if reader.position != bytes.len() {
        log::warn!(
            "ignoring {} trailing bytes after marshal data",
            bytes.len() - reader.position
        );
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
    symbols: Vec<String>,
    objects: Vec<MarshalValue>,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            symbols: Vec::new(),
            objects: Vec::new(),
        }
    }

    fn read_header(&mut self) -> Result<(), MarshalError> {
        let major = self.read_byte()?;
        let minor = self.read_byte()?;
        if major != MARSHAL_MAJOR || minor > MARSHAL_MINOR {
            return Err(MarshalError::BadVersion { major, minor });
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, MarshalError> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or(MarshalError::UnexpectedEnd {
                offset: self.position,
            })?;
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], MarshalError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(MarshalError::UnexpectedEnd {
                offset: self.position,
            })?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_fixnum(&mut self) -> Result<i64, MarshalError> {
        let head = self.read_byte()? as i8;
        match head {
            0 => Ok(0),
            5..=i8::MAX => Ok(i64::from(head) - 5),
            i8::MIN..=-5 => Ok(i64::from(head) + 5),
            1..=4 => {
                let mut value = 0i64;
                for index in 0..head as usize {
                    value |= i64::from(self.read_byte()?) << (8 * index);
                }
                Ok(value)
            }
            _ => {
                let len = (-head) as usize;
                let mut value = -1i64;
                for index in 0..len {
                    value &= !(0xff << (8 * index));
                    value |= i64::from(self.read_byte()?) << (8 * index);
                }
                Ok(value)
            }
        }
    }

    fn read_len(&mut self) -> Result<usize, MarshalError> {
        let offset = self.position;
        let len = self.read_fixnum()?;
        usize::try_from(len).map_err(|_| MarshalError::NegativeLength { offset, len })
    }

    fn read_value(&mut self, depth: usize) -> Result<MarshalValue, MarshalError> {
        if depth > MAX_DEPTH {
            return Err(MarshalError::TooDeep {
                offset: self.position,
            });
        }

        let offset = self.position;
        let tag = self.read_byte()?;
        match tag {
            b'0' => Ok(MarshalValue::Nil),
            b'T' => Ok(MarshalValue::Bool(true)),
            b'F' => Ok(MarshalValue::Bool(false)),
            b'i' => Ok(MarshalValue::Int(self.read_fixnum()?)),
            b'l' => self.read_bignum(offset),
            b'"' => {
                let len = self.read_len()?;
                let value = MarshalValue::raw_string(self.read_bytes(len)?);
                self.objects.push(value.clone());
                Ok(value)
            }
            b':' => {
                let symbol = self.read_symbol_body()?;
                Ok(MarshalValue::Symbol(symbol))
            }
            b';' => {
                let index = self.read_len()?;
                let symbol = self
                    .symbols
                    .get(index)
                    .cloned()
                    .ok_or(MarshalError::BadLink { offset, index })?;
                Ok(MarshalValue::Symbol(symbol))
            }
            b'@' => {
                let index = self.read_len()?;
                self.objects
                    .get(index)
                    .cloned()
                    .ok_or(MarshalError::BadLink { offset, index })
            }
            b'I' => self.read_ivar(depth),
            b'[' => {
                let len = self.read_len()?;
                let slot = self.objects.len();
                self.objects.push(MarshalValue::Nil);
                let mut items = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                let value = MarshalValue::Array(items);
                self.objects[slot] = value.clone();
                Ok(value)
            }
            other => Err(MarshalError::UnsupportedTag { offset, tag: other }),
        }
    }

    fn read_bignum(&mut self, offset: usize) -> Result<MarshalValue, MarshalError> {
        let sign = self.read_byte()?;
        let words = self.read_len()?;
        let width = words
            .checked_mul(2)
            .ok_or(MarshalError::IntegerRange { offset })?;
        let digits = self.read_bytes(width)?;
        if digits.iter().skip(8).any(|byte| *byte != 0) {
            return Err(MarshalError::IntegerRange { offset });
        }
        let mut magnitude = 0u64;
        for (index, byte) in digits.iter().take(8).enumerate() {
            magnitude |= u64::from(*byte) << (8 * index);
        }
        let value = i64::try_from(magnitude).map_err(|_| MarshalError::IntegerRange { offset })?;
        let value = if sign == b'-' { -value } else { value };
        self.objects.push(MarshalValue::Int(value));
        Ok(MarshalValue::Int(value))
    }

    fn read_symbol_body(&mut self) -> Result<String, MarshalError> {
        let len = self.read_len()?;
        let symbol = String::from_utf8_lossy(self.read_bytes(len)?).into_owned();
        self.symbols.push(symbol.clone());
        Ok(symbol)
    }

    fn read_ivar(&mut self, depth: usize) -> Result<MarshalValue, MarshalError> {
        let offset = self.position;
        let slot = self.objects.len();
        let inner = self.read_value(depth + 1)?;
        let count = self.read_len()?;
        let mut utf8 = false;
        for _ in 0..count {
            let name = match self.read_value(depth + 1)? {
                MarshalValue::Symbol(name) => name,
                other => {
                    return Err(MarshalError::UnexpectedValue {
                        offset,
                        expected: "symbol",
                        found: other.type_name(),
                    })
                }
            };
            let value = self.read_value(depth + 1)?;
            match (name.as_str(), &value) {
                ("E", MarshalValue::Bool(true)) => utf8 = true,
                ("encoding", MarshalValue::Str(encoding)) => {
                    utf8 = encoding.bytes.eq_ignore_ascii_case(b"utf-8");
                }
                _ => {}
            }
        }

        let string = match inner {
            MarshalValue::Str(string) => string,
            other => return Ok(other),
        };
        let value = MarshalValue::Str(MarshalString {
            bytes: string.bytes,
            encoding: if utf8 {
                StringEncoding::Utf8Ivar
            } else {
                StringEncoding::Raw
            },
        });
        // The wrapped string registered itself first; links must see the flags.
        if let Some(object) = self.objects.get_mut(slot) {
            *object = value.clone();
        }
        Ok(value)
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn read_fixnum_covers_every_width() {
        let cases: &[(&[u8], i64)] = &[
            (&[0x04, 0x08, b'i', 0x00], 0),
            (&[0x04, 0x08, b'i', 0x06], 1),
            (&[0x04, 0x08, b'i', 0x7f], 122),
            (&[0x04, 0x08, b'i', 0xfa], -1),
            (&[0x04, 0x08, b'i', 0x80], -123),
            (&[0x04, 0x08, b'i', 0x01, 0x7b], 123),
            (&[0x04, 0x08, b'i', 0x02, 0x00, 0x01], 256),
            (&[0x04, 0x08, b'i', 0x04, 0xff, 0xe0, 0xf5, 0x05], 99_999_999),
            (&[0x04, 0x08, b'i', 0xff, 0x84], -124),
            (&[0x04, 0x08, b'i', 0xff, 0x00], -256),
        ];
        for (bytes, expected) in cases {
            let value = read_value(bytes).expect("fixnum should decode");
            assert_eq!(value, MarshalValue::Int(*expected), "bytes {:?}", bytes);
        }
    }

    #[test]
    fn read_value_resolves_symbol_and_object_links() {
        // [I"a" E:T, I"b" E(;0)T, @1]
        let bytes = [
            0x04, 0x08, b'[', 0x08, b'I', b'"', 0x06, b'a', 0x06, b':', 0x06, b'E', b'T', b'I',
            b'"', 0x06, b'b', 0x06, b';', 0x00, b'T', b'@', 0x06,
        ];
        let value = read_value(&bytes).expect("array should decode");
        let MarshalValue::Array(items) = value else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], MarshalValue::utf8_string("a"));
        assert_eq!(items[1], MarshalValue::utf8_string("b"));
        assert_eq!(items[2], MarshalValue::utf8_string("a"));
    }

    #[test]
    fn read_value_decodes_small_bignum() {
        let bytes = [0x04, 0x08, b'l', b'-', 0x07, 0x00, 0x00, 0x00, 0x40];
        let value = read_value(&bytes).expect("bignum should decode");
        assert_eq!(value, MarshalValue::Int(-(1 << 30)));
    }

    #[test]
    fn read_value_rejects_bad_header_and_truncation() {
        let error = read_value(&[0x03, 0x00]).expect_err("old version");
        assert!(matches!(error, MarshalError::BadVersion { .. }));

        let error = read_value(&[0x04, 0x08, b'"', 0x0a, b'a']).expect_err("short string");
        assert!(matches!(error, MarshalError::UnexpectedEnd { .. }));

        let error = read_value(&[0x04, 0x08, b'o']).expect_err("objects unsupported");
        assert!(matches!(error, MarshalError::UnsupportedTag { tag: b'o', .. }));

        let error = read_value(&[0x04, 0x08, b';', 0x00]).expect_err("dangling symlink");
        assert!(matches!(error, MarshalError::BadLink { .. }));
    }

    #[test]
    fn read_value_bounds_nesting_depth() {
        let mut bytes = vec![0x04, 0x08];
        for _ in 0..(MAX_DEPTH + 2) {
            bytes.extend_from_slice(&[b'[', 0x06]);
        }
        bytes.push(b'0');
        let error = read_value(&bytes).expect_err("too deep");
        assert!(matches!(error, MarshalError::TooDeep { .. }));
    }
}
