//! Parsing and checking of the `*IDN?` reply.

use core::fmt;

use thiserror::Error;

/// Manufacturer field the instrument must report.
pub const EXPECTED_MANUFACTURER: &str = "RIGOL TECHNOLOGIES";
/// Model field the instrument must report.
pub const EXPECTED_MODEL: &str = "DP832";

/// Firmware version, kept as the digit groups the instrument sent (`00.01.14`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl FirmwareVersion {
    /// Split `<major>.<minor>.<patch>`. Each group must be non-empty and all digits.
    pub fn parse(field: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = field.split('.').collect();
        let &[major, minor, patch] = parts.as_slice() else {
            return Err(IdentityError::VersionShape(field.to_string()));
        };
        let numeric = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !(numeric(major) && numeric(minor) && numeric(patch)) {
            return Err(IdentityError::VersionShape(field.to_string()));
        }
        Ok(FirmwareVersion {
            major: major.to_string(),
            minor: minor.to_string(),
            patch: patch.to_string(),
        })
    }

    /// The digit groups as integers.
    pub fn numeric(&self) -> (u32, u32, u32) {
        // Digits were checked in `parse`, only absurdly long groups can fail here.
        let n = |p: &str| p.parse().unwrap_or(u32::MAX);
        (n(&self.major), n(&self.minor), n(&self.patch))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identity record captured once per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub version: FirmwareVersion,
}

/// Why an identification reply was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Device did not respond to identification command")]
    Empty,
    #[error("Identification has to consist of 4 fields, got {0}")]
    FieldCount(usize),
    #[error("Version number has to consist of 3 parts, got {0}")]
    VersionShape(String),
    #[error("Expected manufacturer RIGOL TECHNOLOGIES, got {0}")]
    Manufacturer(String),
    #[error("Expected device type DP832, got {0}")]
    Model(String),
}

impl Identity {
    /// Parse `<manufacturer>,<model>,<serial>,<version>` without judging who sent it.
    pub fn parse(response: &str) -> Result<Self, IdentityError> {
        if response.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        let fields: Vec<&str> = response.split(',').map(str::trim).collect();
        let &[manufacturer, model, serial, version] = fields.as_slice() else {
            return Err(IdentityError::FieldCount(fields.len()));
        };
        Ok(Identity {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            serial: serial.to_string(),
            version: FirmwareVersion::parse(version)?,
        })
    }

    /// Parse and require a DP832 made by Rigol.
    pub fn parse_expected(response: &str) -> Result<Self, IdentityError> {
        let identity = Self::parse(response)?;
        if identity.manufacturer != EXPECTED_MANUFACTURER {
            return Err(IdentityError::Manufacturer(identity.manufacturer));
        }
        if identity.model != EXPECTED_MODEL {
            return Err(IdentityError::Model(identity.model));
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dp832_identity() {
        let id = Identity::parse_expected("RIGOL TECHNOLOGIES,DP832,DP8A123456,00.01.02").unwrap();
        assert_eq!(id.serial, "DP8A123456");
        assert_eq!(
            (
                id.version.major.as_str(),
                id.version.minor.as_str(),
                id.version.patch.as_str()
            ),
            ("00", "01", "02")
        );
        assert_eq!(id.version.numeric(), (0, 1, 2));
        assert_eq!(id.version.to_string(), "00.01.02");
    }

    #[test]
    fn rejects_other_manufacturer() {
        let err = Identity::parse_expected("ACME,DP832,DP8A123456,00.01.02").unwrap_err();
        assert_eq!(err, IdentityError::Manufacturer("ACME".to_string()));
        // Parsing alone does not care who made it.
        assert!(Identity::parse("ACME,DP832,DP8A123456,00.01.02").is_ok());
    }

    #[test]
    fn rejects_other_model() {
        let err = Identity::parse_expected("RIGOL TECHNOLOGIES,DP831,X,00.01.02").unwrap_err();
        assert_eq!(err, IdentityError::Model("DP831".to_string()));
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            Identity::parse("RIGOL TECHNOLOGIES,DP832,DP8A123456"),
            Err(IdentityError::FieldCount(3))
        );
        assert_eq!(Identity::parse(""), Err(IdentityError::Empty));
    }

    #[test]
    fn rejects_bad_version() {
        for version in ["00.01", "00.01.02.03", "00..02", "v1.2.3"] {
            let response = format!("RIGOL TECHNOLOGIES,DP832,DP8A123456,{version}");
            assert!(matches!(
                Identity::parse(&response),
                Err(IdentityError::VersionShape(_))
            ));
        }
    }
}
