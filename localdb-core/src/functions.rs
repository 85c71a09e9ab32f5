use std::{env, io};

use crate::LocalDbError;

/// The longest identifier SQL Server accepts.
const MAX_IDENTIFIER_LENGTH: usize = 128;
/// The longest suffix appended to a database name to build a logical file name.
const LOGICAL_NAME_SUFFIX_LENGTH: usize = "_data".len();

/// Expand `%NAME%` sequences the way Windows does. Unknown variables are left as they are.
///
/// ```
/// use localdb_core::expand_environment_variables;
///
/// std::env::set_var("LOCALDB_DOC_EXAMPLE", "C:\\Temp");
///
/// assert_eq!(r"C:\Temp\LocalDb", expand_environment_variables(r"%LOCALDB_DOC_EXAMPLE%\LocalDb"));
/// assert_eq!("%NOT_SET_ANYWHERE%", expand_environment_variables("%NOT_SET_ANYWHERE%"));
/// ```
pub fn expand_environment_variables(s: impl AsRef<str>) -> String {
    let mut s = s.as_ref();

    let mut result = String::with_capacity(s.len());

    while let Some(start) = s.find('%') {
        result.push_str(&s[..start]);

        let rest = &s[start + 1..];

        match rest.find('%') {
            Some(end) => {
                let name = &rest[..end];

                match env::var(name) {
                    Ok(value) if !name.is_empty() => {
                        result.push_str(&value);

                        s = &rest[end + 1..];
                    },
                    _ => {
                        // keep the first `%` and retry from the closing one
                        result.push('%');
                        result.push_str(name);

                        s = &rest[end..];
                    },
                }
            },
            None => {
                result.push('%');

                s = rest;

                break;
            },
        }
    }

    result.push_str(s);

    result
}

/// Check whether a database name can be used both as an identifier and as a part of file names.
pub(crate) fn validate_database_name(name: &str) -> Result<(), LocalDbError> {
    let length = name.chars().count();

    let valid = length > 0
        && length <= MAX_IDENTIFIER_LENGTH - LOGICAL_NAME_SUFFIX_LENGTH
        && !name.chars().any(|c| {
            c.is_control() || matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';')
        });

    if valid {
        Ok(())
    } else {
        Err(LocalDbError::InvalidDatabaseName {
            name: name.to_string(),
        })
    }
}

#[inline]
pub(crate) fn allow_not_found_error(result: io::Result<()>) -> io::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}
