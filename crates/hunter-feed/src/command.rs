//! Commands sent to the console actor by the rendering layer or the CLI.

use std::fmt;

use hunter_core::mask_credential;

/// A human action on the console.
#[derive(Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Raw key as typed. Validation happens in the console so an empty
    /// submission can still produce a notice.
    SubmitKey(String),
    /// Forget the stored key and disconnect.
    ClearKey,
}

impl fmt::Debug for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitKey(raw) => f
                .debug_tuple("SubmitKey")
                .field(&mask_credential(raw.trim()))
                .finish(),
            Self::ClearKey => f.write_str("ClearKey"),
        }
    }
}
