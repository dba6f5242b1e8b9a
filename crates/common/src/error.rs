use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A host-supplied callback returned an error.
    #[error("{callback} callback failed: {message}")]
    Callback {
        callback: &'static str,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn callback(callback: &'static str, source: &anyhow::Error) -> Self {
        Self::Callback {
            callback,
            message: format!("{source:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can be built from a plain message string.
///
/// Crates implement this for their own `Error` and then call
/// [`impl_context!`] inside their error module.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait adding `.context()` and
/// `.with_context()` to `Result` and `Option`.
///
/// The invoking module must define `Error: FromMessage` and a
/// `Result<T>` alias.
///
/// ```ignore
/// // crates/store/src/error.rs
/// beacon_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let prefix = context.into();
                self.map_err(|e| {
                    <Error as $crate::FromMessage>::from_message(format!("{prefix}: {e}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|e| {
                    let prefix = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{prefix}: {e}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    mod local {
        #[derive(Debug)]
        pub struct Error(pub String);

        impl crate::FromMessage for Error {
            fn from_message(message: String) -> Self {
                Self(message)
            }
        }

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();
    }

    use local::Context;

    #[test]
    fn context_prefixes_result_errors() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = res.context("writing state").unwrap_err();
        assert_eq!(err.0, "writing state: disk full");
    }

    #[test]
    fn context_on_none() {
        let err = None::<u8>.with_context(|| "no token").unwrap_err();
        assert_eq!(err.0, "no token");
    }

    #[test]
    fn callback_error_keeps_chain() {
        let source = anyhow::anyhow!("boom").context("renderer gone");
        let err = Error::callback("on-started", &source);
        assert_eq!(
            err.to_string(),
            "on-started callback failed: renderer gone: boom"
        );
    }
}
