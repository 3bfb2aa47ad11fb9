//! The GRF record value object (§3): a validated name, the declared
//! filesize/width_bytes fields, and the decoded payload bitmap.

use crate::bitmap::Bitmap;
use crate::zpl::error::ZplError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrfRecord {
    pub name: String,
    pub filesize: usize,
    pub width_bytes: usize,
    pub bitmap: Bitmap,
}

impl GrfRecord {
    /// Validates and canonicalises a GRF name: 1-8 alphanumeric ASCII
    /// characters, stored uppercase.
    pub fn validate_name(name: &str) -> Result<String, ZplError> {
        if name.is_empty() || name.len() > 8 || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ZplError::InvalidName(name.to_string()));
        }
        Ok(name.to_ascii_uppercase())
    }

    /// Wraps an already-decoded bitmap as a GRF record under `name`.
    pub fn from_bitmap(name: &str, bitmap: Bitmap) -> Result<Self, ZplError> {
        let name = Self::validate_name(name)?;
        Ok(Self {
            name,
            filesize: bitmap.buffer().len(),
            width_bytes: bitmap.width_bytes(),
            bitmap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_1_to_8_alphanumeric() {
        assert_eq!(GrfRecord::validate_name("sample1").unwrap(), "SAMPLE1");
        assert_eq!(GrfRecord::validate_name("A").unwrap(), "A");
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(
            GrfRecord::validate_name(""),
            Err(ZplError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_too_long_name() {
        assert!(matches!(
            GrfRecord::validate_name("TOOLONGNAME"),
            Err(ZplError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_non_alphanumeric() {
        assert!(matches!(
            GrfRecord::validate_name("BAD-NAME"),
            Err(ZplError::InvalidName(_))
        ));
    }
}
