//! Respondent contact details collected after the last question.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanySize {
    S1,
    S2,
    S3,
    S4,
    S5,
}

impl CompanySize {
    pub const ALL: [CompanySize; 5] = [
        CompanySize::S1,
        CompanySize::S2,
        CompanySize::S3,
        CompanySize::S4,
        CompanySize::S5,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CompanySize::S1 => "s1",
            CompanySize::S2 => "s2",
            CompanySize::S3 => "s3",
            CompanySize::S4 => "s4",
            CompanySize::S5 => "s5",
        }
    }

    /// Accepts the code (`s3`) or its 1-based position in the list (`3`).
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .enumerate()
            .find(|(index, size)| size.code() == code || (index + 1).to_string() == code)
            .map(|(_, size)| size)
    }

    pub fn label_key(self) -> String {
        format!("personal.sizeOptions.{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FullName,
    CompanyName,
    Sector,
    Size,
    Phone,
    Email,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::FullName,
        Field::CompanyName,
        Field::Sector,
        Field::Size,
        Field::Phone,
        Field::Email,
    ];

    /// Wire name, also used as the catalog key under `personal.`.
    pub fn name(self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::CompanyName => "companyName",
            Field::Sector => "sector",
            Field::Size => "size",
            Field::Phone => "phone",
            Field::Email => "email",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub fn label_key(self) -> String {
        format!("personal.{}", self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub company_name: String,
    pub sector: String,
    #[serde(with = "size_code")]
    pub size: Option<CompanySize>,
    pub phone: String,
    pub email: String,
}

impl PersonalInfo {
    /// A full name and something shaped like an email address are required.
    pub fn is_valid(&self) -> bool {
        !self.full_name.trim().is_empty() && EMAIL.is_match(&self.email)
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::FullName => &self.full_name,
            Field::CompanyName => &self.company_name,
            Field::Sector => &self.sector,
            Field::Size => self.size.map(CompanySize::code).unwrap_or(""),
            Field::Phone => &self.phone,
            Field::Email => &self.email,
        }
    }

    pub fn set(&mut self, field: Field, value: &str) -> Result<(), Error> {
        match field {
            Field::FullName => self.full_name = value.to_string(),
            Field::CompanyName => self.company_name = value.to_string(),
            Field::Sector => self.sector = value.to_string(),
            Field::Size if value.trim().is_empty() => self.size = None,
            Field::Size => {
                let size = CompanySize::from_code(value).ok_or_else(|| Error::InvalidField {
                    field: field.name(),
                    value: value.to_string(),
                })?;
                self.size = Some(size);
            }
            Field::Phone => self.phone = value.to_string(),
            Field::Email => self.email = value.to_string(),
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Serializes an unset size as `""`.
mod size_code {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::CompanySize;

    pub fn serialize<S: Serializer>(
        size: &Option<CompanySize>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(size.map(CompanySize::code).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<CompanySize>, D::Error> {
        let code = String::deserialize(deserializer)?;
        if code.is_empty() {
            return Ok(None);
        }
        CompanySize::from_code(&code)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unknown company size '{code}'")))
    }
}
