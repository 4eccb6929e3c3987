//! Packet payload encoding and decoding.
//!
//! All multi-byte quantities are big-endian. Identifiers use the widths
//! negotiated via `VirtualMachine.IDSizes`, so both directions carry an
//! [`IdSizes`] copy.

use crate::consts::tag;
use crate::error::JdwpError;
use crate::types::{IdSizes, JdwpValue, Location};

pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    sizes: IdSizes,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8], sizes: IdSizes) -> Self {
        Self { buf, pos: 0, sizes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], JdwpError> {
        if self.pos + len > self.buf.len() {
            return Err(JdwpError::Protocol("unexpected end of packet".to_string()));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, JdwpError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, JdwpError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, JdwpError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().expect("2 bytes")))
    }

    pub fn read_i32(&mut self) -> Result<i32, JdwpError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes(bytes.try_into().expect("4 bytes")))
    }

    pub fn read_u32(&mut self) -> Result<u32, JdwpError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().expect("4 bytes")))
    }

    pub fn read_i64(&mut self) -> Result<i64, JdwpError> {
        let bytes = self.take(8)?;
        Ok(i64::from_be_bytes(bytes.try_into().expect("8 bytes")))
    }

    pub fn read_u64(&mut self) -> Result<u64, JdwpError> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().expect("8 bytes")))
    }

    fn read_sized_id(&mut self, size: usize) -> Result<u64, JdwpError> {
        let bytes = self.take(size)?;
        let mut value = 0u64;
        for b in bytes {
            value = (value << 8) | u64::from(*b);
        }
        Ok(value)
    }

    pub fn read_object_id(&mut self) -> Result<u64, JdwpError> {
        self.read_sized_id(self.sizes.object_id)
    }

    pub fn read_reference_type_id(&mut self) -> Result<u64, JdwpError> {
        self.read_sized_id(self.sizes.reference_type_id)
    }

    pub fn read_method_id(&mut self) -> Result<u64, JdwpError> {
        self.read_sized_id(self.sizes.method_id)
    }

    pub fn read_field_id(&mut self) -> Result<u64, JdwpError> {
        self.read_sized_id(self.sizes.field_id)
    }

    pub fn read_frame_id(&mut self) -> Result<u64, JdwpError> {
        self.read_sized_id(self.sizes.frame_id)
    }

    pub fn read_string(&mut self) -> Result<String, JdwpError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_location(&mut self) -> Result<Location, JdwpError> {
        Ok(Location {
            type_tag: self.read_u8()?,
            class_id: self.read_reference_type_id()?,
            method_id: self.read_method_id()?,
            index: self.read_u64()?,
        })
    }

    /// Reads a tag byte followed by the value payload for that tag.
    pub fn read_tagged_value(&mut self) -> Result<JdwpValue, JdwpError> {
        let tag = self.read_u8()?;
        self.read_untagged_value(tag)
    }

    /// Reads a value payload whose tag is known from context (e.g. a
    /// primitive array region).
    pub fn read_untagged_value(&mut self, value_tag: u8) -> Result<JdwpValue, JdwpError> {
        Ok(match value_tag {
            tag::VOID => JdwpValue::Void,
            tag::BOOLEAN => JdwpValue::Boolean(self.read_u8()? != 0),
            tag::BYTE => JdwpValue::Byte(self.read_u8()? as i8),
            tag::CHAR => JdwpValue::Char(self.read_u16()?),
            tag::SHORT => JdwpValue::Short(self.read_u16()? as i16),
            tag::INT => JdwpValue::Int(self.read_i32()?),
            tag::LONG => JdwpValue::Long(self.read_i64()?),
            tag::FLOAT => JdwpValue::Float(f32::from_bits(self.read_u32()?)),
            tag::DOUBLE => JdwpValue::Double(f64::from_bits(self.read_u64()?)),
            t if tag::is_object_like(t) => JdwpValue::Object {
                tag: t,
                id: self.read_object_id()?,
            },
            other => {
                return Err(JdwpError::Protocol(format!(
                    "unknown value tag 0x{other:02x}"
                )))
            }
        })
    }
}

pub(crate) struct Out {
    buf: Vec<u8>,
    sizes: IdSizes,
}

impl Out {
    pub fn new(sizes: IdSizes) -> Self {
        Self {
            buf: Vec::new(),
            sizes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn write_sized_id(&mut self, size: usize, value: u64) -> &mut Self {
        let bytes = value.to_be_bytes();
        let start = bytes.len().saturating_sub(size);
        self.buf.extend_from_slice(&bytes[start..]);
        self
    }

    pub fn write_object_id(&mut self, id: u64) -> &mut Self {
        self.write_sized_id(self.sizes.object_id, id)
    }

    pub fn write_reference_type_id(&mut self, id: u64) -> &mut Self {
        self.write_sized_id(self.sizes.reference_type_id, id)
    }

    pub fn write_method_id(&mut self, id: u64) -> &mut Self {
        self.write_sized_id(self.sizes.method_id, id)
    }

    pub fn write_field_id(&mut self, id: u64) -> &mut Self {
        self.write_sized_id(self.sizes.field_id, id)
    }

    pub fn write_frame_id(&mut self, id: u64) -> &mut Self {
        self.write_sized_id(self.sizes.frame_id, id)
    }

    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn write_location(&mut self, location: &Location) -> &mut Self {
        self.write_u8(location.type_tag);
        self.write_reference_type_id(location.class_id);
        self.write_method_id(location.method_id);
        self.write_u64(location.index)
    }

    /// Writes a tag byte followed by the value payload.
    pub fn write_tagged_value(&mut self, value: &JdwpValue) -> &mut Self {
        self.write_u8(value.tag());
        self.write_value_payload(value)
    }

    fn write_value_payload(&mut self, value: &JdwpValue) -> &mut Self {
        match value {
            JdwpValue::Void => self,
            JdwpValue::Boolean(v) => self.write_u8(u8::from(*v)),
            JdwpValue::Byte(v) => self.write_u8(*v as u8),
            JdwpValue::Char(v) => {
                self.buf.extend_from_slice(&v.to_be_bytes());
                self
            }
            JdwpValue::Short(v) => {
                self.buf.extend_from_slice(&v.to_be_bytes());
                self
            }
            JdwpValue::Int(v) => self.write_i32(*v),
            JdwpValue::Long(v) => {
                self.buf.extend_from_slice(&v.to_be_bytes());
                self
            }
            JdwpValue::Float(v) => {
                self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
                self
            }
            JdwpValue::Double(v) => {
                self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
                self
            }
            JdwpValue::Object { id, .. } => self.write_object_id(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trips_through_tagged_encoding() {
        let sizes = IdSizes::default();
        let values = [
            JdwpValue::Boolean(true),
            JdwpValue::Byte(-3),
            JdwpValue::Char(0x263a),
            JdwpValue::Short(-2000),
            JdwpValue::Int(123456),
            JdwpValue::Long(-9_000_000_000),
            JdwpValue::Float(1.5),
            JdwpValue::Double(-2.25),
            JdwpValue::Object {
                tag: tag::STRING,
                id: 0xdead_beef,
            },
        ];

        for value in values {
            let mut out = Out::new(sizes);
            out.write_tagged_value(&value);
            let bytes = out.into_bytes();
            let mut cursor = Cursor::new(&bytes, sizes);
            assert_eq!(cursor.read_tagged_value().unwrap(), value);
        }
    }

    #[test]
    fn ids_are_encoded_with_negotiated_width() {
        let sizes = IdSizes {
            object_id: 4,
            ..IdSizes::default()
        };
        let mut out = Out::new(sizes);
        out.write_object_id(0x0102_0304);
        let bytes = out.into_bytes();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);

        let mut cursor = Cursor::new(&bytes, sizes);
        assert_eq!(cursor.read_object_id().unwrap(), 0x0102_0304);
    }

    #[test]
    fn location_round_trips() {
        let sizes = IdSizes::default();
        let location = Location {
            type_tag: 1,
            class_id: 0x10,
            method_id: 0x20,
            index: 7,
        };
        let mut out = Out::new(sizes);
        out.write_location(&location);
        let bytes = out.into_bytes();
        let mut cursor = Cursor::new(&bytes, sizes);
        assert_eq!(cursor.read_location().unwrap(), location);
    }

    #[test]
    fn truncated_payload_is_a_protocol_error() {
        let sizes = IdSizes::default();
        let mut cursor = Cursor::new(&[0x00, 0x01], sizes);
        assert!(matches!(
            cursor.read_i32(),
            Err(JdwpError::Protocol(_))
        ));
    }
}
