use crate::value::{MarshalString, MarshalValue, StringEncoding};
use crate::{MarshalError, MARSHAL_MAJOR, MARSHAL_MINOR};

pub fn write_value(value: &MarshalValue) -> Result<Vec<u8>, MarshalError> {
    let mut writer = Writer::default();
    writer.out.push(MARSHAL_MAJOR);
    writer.out.push(MARSHAL_MINOR);
    writer.write_value(value)?;
    Ok(writer.out)
}

#[derive(Default)]
struct Writer {
    out: Vec<u8>,
    symbols: Vec<String>,
}

impl Writer {
    fn write_value(&mut self, value: &MarshalValue) -> Result<(), MarshalError> {
        match value {
            MarshalValue::Nil => self.out.push(b'0'),
            MarshalValue::Bool(true) => self.out.push(b'T'),
            MarshalValue::Bool(false) => self.out.push(b'F'),
            MarshalValue::Int(value) => {
                let value =
                    i32::try_from(*value).map_err(|_| MarshalError::IntegerRange { offset: 0 })?;
                self.out.push(b'i');
                self.write_fixnum(value);
            }
            MarshalValue::Str(string) => self.write_string(string)?,
            MarshalValue::Symbol(name) => self.write_symbol(name)?,
            MarshalValue::Array(items) => {
                self.out.push(b'[');
                self.write_len(items.len())?;
                for item in items {
                    self.write_value(item)?;
                }
            }
        }
        Ok(())
    }

    fn write_fixnum(&mut self, value: i32) {
        let value = i64::from(value);
        if value == 0 {
            self.out.push(0);
            return;
        }
        if 0 < value && value < 123 {
            self.out.push((value + 5) as u8);
            return;
        }
        if -124 < value && value < 0 {
            self.out.push(((value - 5) & 0xff) as u8);
            return;
        }

        let mut rest = value;
        let mut digits = Vec::with_capacity(4);
        loop {
            digits.push((rest & 0xff) as u8);
            rest >>= 8;
            if rest == 0 {
                self.out.push(digits.len() as u8);
                break;
            }
            if rest == -1 {
                self.out.push((-(digits.len() as i8)) as u8);
                break;
            }
        }
        self.out.extend_from_slice(&digits);
    }

    fn write_len(&mut self, len: usize) -> Result<(), MarshalError> {
        let len = i32::try_from(len).map_err(|_| MarshalError::IntegerRange { offset: 0 })?;
        self.write_fixnum(len);
        Ok(())
    }

    fn write_string(&mut self, string: &MarshalString) -> Result<(), MarshalError> {
        if string.encoding == StringEncoding::Utf8Ivar {
            self.out.push(b'I');
        }
        self.out.push(b'"');
        self.write_len(string.bytes.len())?;
        self.out.extend_from_slice(&string.bytes);
        if string.encoding == StringEncoding::Utf8Ivar {
            self.write_fixnum(1);
            self.write_symbol("E")?;
            self.out.push(b'T');
        }
        Ok(())
    }

    fn write_symbol(&mut self, name: &str) -> Result<(), MarshalError> {
        if let Some(index) = self.symbols.iter().position(|symbol| symbol == name) {
            self.out.push(b';');
            return self.write_len(index);
        }
        self.symbols.push(name.to_string());
        self.out.push(b':');
        self.write_len(name.len())?;
        self.out.extend_from_slice(name.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod writer_tests {
    use super::*;
    use crate::reader::read_value;

    #[test]
    fn write_fixnum_matches_ruby_layout() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x00]),
            (5, &[0x0a]),
            (-5, &[0xf6]),
            (300, &[0x02, 0x2c, 0x01]),
            (-300, &[0xfe, 0xd4, 0xfe]),
            (99_999_998, &[0x04, 0xfe, 0xe0, 0xf5, 0x05]),
        ];
        for (value, expected) in cases {
            let bytes = write_value(&MarshalValue::Int(*value)).expect("fixnum should encode");
            assert_eq!(&bytes[..3], &[0x04, 0x08, b'i']);
            assert_eq!(&bytes[3..], *expected, "value {}", value);
        }
    }

    #[test]
    fn write_value_reuses_encoding_symbol() {
        let value = MarshalValue::Array(vec![
            MarshalValue::utf8_string("a"),
            MarshalValue::utf8_string("b"),
        ]);
        let bytes = write_value(&value).expect("array should encode");
        assert_eq!(
            bytes,
            vec![
                0x04, 0x08, b'[', 0x07, b'I', b'"', 0x06, b'a', 0x06, b':', 0x06, b'E', b'T',
                b'I', b'"', 0x06, b'b', 0x06, b';', 0x00, b'T',
            ]
        );
        assert_eq!(read_value(&bytes).expect("decode"), value);
    }

    #[test]
    fn write_value_rejects_integers_outside_fixnum_range() {
        let error = write_value(&MarshalValue::Int(i64::from(i32::MAX) + 1))
            .expect_err("out of range");
        assert!(matches!(error, MarshalError::IntegerRange { .. }));
    }
}
