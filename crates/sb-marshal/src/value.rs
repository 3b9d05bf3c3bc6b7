/// The slice of Ruby's object graph a script container uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalValue {
    Nil,
    Bool(bool),
    Int(i64),
    Str(MarshalString),
    Symbol(String),
    Array(Vec<MarshalValue>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarshalString {
    pub bytes: Vec<u8>,
    pub encoding: StringEncoding,
}

/// How a string's encoding is recorded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    /// Plain byte string (Ruby 1.8 data, binary payloads).
    #[default]
    Raw,
    /// Wrapped in an instance-variable block carrying `E: true`.
    Utf8Ivar,
}

impl MarshalValue {
    pub fn raw_string(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Str(MarshalString {
            bytes: bytes.into(),
            encoding: StringEncoding::Raw,
        })
    }

    pub fn utf8_string(text: &str) -> Self {
        Self::Str(MarshalString {
            bytes: text.as_bytes().to_vec(),
            encoding: StringEncoding::Utf8Ivar,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Array(_) => "array",
        }
    }
}
