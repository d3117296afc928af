//! Strongly Typed Identifiers
//!
//! This module provides type-safe identifier types for regsync.
//! Every identifier here is owned by the external student information
//! system, so all of them are string-backed newtypes rather than UUIDs.
//!
//! # Example
//!
//! ```
//! use regsync_core::{Crn, StudentId};
//!
//! let student = StudentId::from("A1234567");
//! let crn = Crn::from("12345");
//!
//! // Type safety: cannot pass a Crn where a StudentId is expected
//! fn requires_student(id: &StudentId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_student(&student);
//! // requires_student(&crn); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Macro to define a strongly-typed, string-backed ID type
macro_rules! define_external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing external value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the underlying external value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_external_id! {
    /// The student identifier the SIS keys registration records by.
    StudentId
}

define_external_id! {
    /// Course reference number: the SIS identifier for one scheduled
    /// section of a course.
    Crn
}

define_external_id! {
    /// Course identity (subject + number, e.g. "MATH 101").
    CourseId
}

define_external_id! {
    /// External request id assigned by the SIS when an override request
    /// is submitted. Before submission a request has no identity.
    RequestId
}

define_external_id! {
    /// Academic term code in the SIS (e.g. "202710").
    TermId
}

define_external_id! {
    /// Campus code in the SIS.
    CampusId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        let student = StudentId::from("A1234567");
        assert_eq!(student.to_string(), "A1234567");
        assert_eq!(student.as_str(), "A1234567");
    }

    #[test]
    fn test_serde_transparent() {
        let crn = Crn::from("12345");
        let json = serde_json::to_string(&crn).unwrap();
        assert_eq!(json, "\"12345\"");
        let back: Crn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, crn);
    }

    #[test]
    fn test_distinct_types_compare_by_value() {
        assert_eq!(CourseId::from("MATH 101"), CourseId::new("MATH 101"));
        assert_ne!(RequestId::from("1"), RequestId::from("2"));
    }
}
