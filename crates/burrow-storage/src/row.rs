//! Fixed-width row codec.
//!
//! A row is serialized into exactly 293 bytes inside a leaf cell:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       4   id (u32, little-endian)
//!   4      33   username (32 content bytes + 1 reserved terminator)
//!  37     256   email (255 content bytes + 1 reserved terminator)
//! ```
//!
//! Strings shorter than their slot are zero-padded; on read, content
//! ends at the first zero byte. Length validation happens in
//! [`Row::new`], before serialization — the codec itself has no error
//! path.

use std::fmt;

use crate::error::{TableError, TableResult};

/// Maximum content bytes of the username column.
pub const COLUMN_USERNAME_SIZE: usize = 32;
/// Maximum content bytes of the email column.
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// Serialized width of the id field.
pub const ID_SIZE: usize = 4;
/// Serialized width of the username slot.
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
/// Serialized width of the email slot.
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

/// Byte offset of the id field within a serialized row.
pub const ID_OFFSET: usize = 0;
/// Byte offset of the username slot.
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
/// Byte offset of the email slot.
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total serialized width of a row (293 bytes).
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single record of the fixed-schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Primary key, strictly positive.
    pub id: u32,
    /// Username column, at most 32 bytes.
    pub username: String,
    /// Email column, at most 255 bytes.
    pub email: String,
}

impl Row {
    /// Creates a row, rejecting oversized string columns.
    pub fn new(id: u32, username: &str, email: &str) -> TableResult<Self> {
        let row = Self {
            id,
            username: username.to_string(),
            email: email.to_string(),
        };
        row.validate()?;
        Ok(row)
    }

    /// Checks the string columns against their content maxima.
    pub fn validate(&self) -> TableResult<()> {
        if self.username.len() > COLUMN_USERNAME_SIZE {
            return Err(TableError::string_too_long(
                "username",
                self.username.len(),
                COLUMN_USERNAME_SIZE,
            ));
        }
        if self.email.len() > COLUMN_EMAIL_SIZE {
            return Err(TableError::string_too_long(
                "email",
                self.email.len(),
                COLUMN_EMAIL_SIZE,
            ));
        }
        Ok(())
    }

    /// Serializes the row into a 293-byte slice.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`ROW_SIZE`] or if a
    /// string column exceeds its slot (callers validate first).
    pub fn serialize(&self, buf: &mut [u8]) {
        assert!(buf.len() >= ROW_SIZE, "buffer too small for row");

        buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());

        let username = self.username.as_bytes();
        buf[USERNAME_OFFSET..USERNAME_OFFSET + username.len()].copy_from_slice(username);
        buf[USERNAME_OFFSET + username.len()..USERNAME_OFFSET + USERNAME_SIZE].fill(0);

        let email = self.email.as_bytes();
        buf[EMAIL_OFFSET..EMAIL_OFFSET + email.len()].copy_from_slice(email);
        buf[EMAIL_OFFSET + email.len()..EMAIL_OFFSET + EMAIL_SIZE].fill(0);
    }

    /// Deserializes a row from a 293-byte slice.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`ROW_SIZE`].
    pub fn deserialize(buf: &[u8]) -> Self {
        assert!(buf.len() >= ROW_SIZE, "buffer too small for row");

        let id_bytes: [u8; ID_SIZE] = buf[ID_OFFSET..ID_OFFSET + ID_SIZE]
            .try_into()
            .expect("id slice has fixed width");

        Self {
            id: u32::from_le_bytes(id_bytes),
            username: read_padded_str(&buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]),
            email: read_padded_str(&buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

/// Reads a zero-padded string slot, stopping at the first zero byte.
fn read_padded_str(slot: &[u8]) -> String {
    let len = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_size() {
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(USERNAME_OFFSET, 4);
        assert_eq!(EMAIL_OFFSET, 37);
    }

    #[test]
    fn test_round_trip() {
        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        assert_eq!(Row::deserialize(&buf), row);
    }

    #[test]
    fn test_round_trip_maximum_lengths() {
        let username = "a".repeat(COLUMN_USERNAME_SIZE);
        let email = "a".repeat(COLUMN_EMAIL_SIZE);
        let row = Row::new(42, &username, &email).unwrap();

        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        let decoded = Row::deserialize(&buf);
        assert_eq!(decoded.username, username);
        assert_eq!(decoded.email, email);
    }

    #[test]
    fn test_rejects_oversized_username() {
        let username = "a".repeat(COLUMN_USERNAME_SIZE + 1);
        let err = Row::new(1, &username, "a@b.c").unwrap_err();
        assert!(matches!(
            err,
            TableError::StringTooLong {
                field: "username",
                len: 33,
                max: 32
            }
        ));
    }

    #[test]
    fn test_rejects_oversized_email() {
        let email = "a".repeat(COLUMN_EMAIL_SIZE + 1);
        let err = Row::new(1, "user", &email).unwrap_err();
        assert!(matches!(err, TableError::StringTooLong { field: "email", .. }));
    }

    #[test]
    fn test_serialize_overwrites_previous_content() {
        let mut buf = [0xffu8; ROW_SIZE];
        let row = Row::new(7, "ab", "c@d.e").unwrap();
        row.serialize(&mut buf);
        let decoded = Row::deserialize(&buf);
        assert_eq!(decoded.username, "ab");
        assert_eq!(decoded.email, "c@d.e");
    }

    #[test]
    fn test_display_format() {
        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        assert_eq!(row.to_string(), "(1, user1, person1@example.com)");
    }
}
