//! Little-endian binary encoding used by the feature cache files.

use std::io::{Read, Write};

use crate::error::Error;

/// Extension trait for writing little-endian binary values.
pub(crate) trait BinaryWrite: Write {
    fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a count or length as a u32.
    fn write_len(&mut self, len: usize, what: &str) -> Result<(), Error> {
        let len = u32::try_from(len)
            .map_err(|_| Error::Validation(format!("{what} exceeds u32::MAX: {len}")))?;
        self.write_u32(len)
    }

    /// Writes a string with a u32 byte-length prefix. Attribute values such as
    /// descriptions and notes are routinely longer than 255 bytes.
    fn write_string(&mut self, s: &str) -> Result<(), Error> {
        self.write_len(s.len(), "string length")?;
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_optional_string(&mut self, s: Option<&str>) -> Result<(), Error> {
        match s {
            Some(s) => {
                self.write_u8(1)?;
                self.write_string(s)
            }
            None => self.write_u8(0),
        }
    }
}

/// Extension trait for reading little-endian binary values.
pub(crate) trait BinaryRead: Read {
    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, Error> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let mut buf = Vec::new();
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(Error::Format(format!(
                "truncated string: expected {len} bytes, got {}",
                buf.len()
            )));
        }
        String::from_utf8(buf).map_err(|e| Error::Parse(format!("invalid UTF-8: {e}")))
    }

    fn read_optional_string(&mut self) -> Result<Option<String>, Error> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_string()?)),
            flag => Err(Error::Format(format!("invalid optional-string flag: {flag}"))),
        }
    }
}

impl<W: Write + ?Sized> BinaryWrite for W {}
impl<R: Read + ?Sized> BinaryRead for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn long_strings_supported() {
        let value = "x".repeat(1000);
        let mut buf = Vec::new();
        buf.write_string(&value).unwrap();
        assert_eq!(buf.len(), 1004);
        assert_eq!(Cursor::new(buf).read_string().unwrap(), value);
    }

    #[test]
    fn optional_strings() {
        let mut buf = Vec::new();
        buf.write_optional_string(None).unwrap();
        buf.write_optional_string(Some("")).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_optional_string().unwrap(), None);
        assert_eq!(cursor.read_optional_string().unwrap(), Some(String::new()));
    }

    #[test]
    fn truncated_string_rejected() {
        let mut buf = Vec::new();
        buf.write_u32(10).unwrap();
        buf.extend_from_slice(b"abc");
        assert!(matches!(
            Cursor::new(buf).read_string(),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn bad_optional_flag() {
        assert!(Cursor::new(vec![7u8]).read_optional_string().is_err());
    }
}
