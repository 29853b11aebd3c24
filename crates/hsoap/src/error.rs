// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by the hsoap runtime.
//!
//! Lower layers (WSDL model, codecs) return narrowly typed variants; the
//! endpoint is the single layer that turns any of them into a SOAP fault.

use crate::qname::QName;
use std::fmt;

/// Errors returned by hsoap operations.
///
/// # Example
///
/// ```rust
/// use hsoap::Error;
///
/// let err = Error::FastInfosetNotAccepted;
/// assert!(err.is_message_error());
/// assert_eq!(err.to_string(), "Fast Infoset not accepted for decoding");
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // WSDL Model Errors
    // ========================================================================
    /// WSDL document could not be parsed.
    WsdlParse(String),
    /// A model element references something that does not exist.
    UnresolvedReference {
        /// Kind of the missing element ("message", "portType", ...).
        kind: &'static str,
        /// Name of the missing element.
        name: QName,
    },
    /// Two definitions share the same qualified name.
    DuplicateDefinition {
        /// Kind of the duplicated element.
        kind: &'static str,
        /// Duplicated name.
        name: QName,
    },
    /// Structural mutation attempted after `freeze()`.
    ModelFrozen,
    /// A `wsdl:required="true"` extension was not understood by any parser extension.
    NotUnderstoodExtension(QName),

    // ========================================================================
    // Negotiation / Codec Errors
    // ========================================================================
    /// Missing or unsupported content type.
    UnsupportedMediaType(Option<String>),
    /// Fast Infoset content arrived where Fast Infoset is not permitted.
    FastInfosetNotAccepted,
    /// Message could not be created from the wire bytes.
    MessageCreation(String),
    /// Malformed XML, MIME or Fast Infoset input (wrapped by the negotiator).
    Malformed(String),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// A tube reported a processing failure.
    Tube {
        /// Name of the failing tube.
        tube: String,
        /// Failure description.
        message: String,
    },
    /// A tube panicked; the panic was isolated by the fiber.
    TubePanicked(String),
    /// A tube returned an action that is illegal in the current direction.
    IllegalAction(&'static str),
    /// The application invoker failed.
    Invocation(String),
    /// No operation matched the request payload.
    DispatchFailed(String),
    /// Header marked mustUnderstand was not understood.
    MustUnderstand(QName),
    /// An item was returned to a pool that did not issue it.
    PoolMismatch {
        /// Pool that issued the item.
        issued_by: u64,
        /// Pool the item was returned to.
        returned_to: u64,
    },
    /// Fiber was resumed while not suspended, or finished twice.
    InvalidFiberState(&'static str),
    /// Endpoint has been disposed.
    Disposed,

    // ========================================================================
    // Configuration / SPI Errors
    // ========================================================================
    /// Invalid runtime configuration.
    Config(String),
    /// Tube factory name not registered.
    UnknownTube(String),
    /// No databinding factory is registered at all.
    NoDatabindingFactory,
    /// Databinding mode has no matching factory.
    UnknownDatabindingMode(String),
    /// Databinding marshal/unmarshal failure.
    Databinding(String),

    // ========================================================================
    // I/O
    // ========================================================================
    /// I/O error with underlying cause.
    Io(std::io::Error),
}

impl Error {
    /// Create a tube failure error.
    pub fn tube(tube: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tube {
            tube: tube.into(),
            message: message.into(),
        }
    }

    /// Errors that cross the codec boundary unwrapped.
    ///
    /// Anything else raised during decode is wrapped into [`Error::MessageCreation`].
    pub fn is_message_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMediaType(_)
                | Error::FastInfosetNotAccepted
                | Error::MessageCreation(_)
        )
    }

    /// Wrap this error into `MessageCreation` unless it is already a message error.
    pub fn into_message_error(self) -> Self {
        if self.is_message_error() {
            self
        } else {
            Error::MessageCreation(self.to_string())
        }
    }

    /// Whether the fault for this error blames the sender (client) rather than the receiver.
    pub fn is_sender_fault(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMediaType(_)
                | Error::FastInfosetNotAccepted
                | Error::MessageCreation(_)
                | Error::Malformed(_)
                | Error::DispatchFailed(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Model
            Error::WsdlParse(msg) => write!(f, "WSDL parse error: {}", msg),
            Error::UnresolvedReference { kind, name } => {
                write!(f, "Unresolved {} reference: {}", kind, name)
            }
            Error::DuplicateDefinition { kind, name } => {
                write!(f, "Duplicate {} definition: {}", kind, name)
            }
            Error::ModelFrozen => write!(f, "WSDL model is frozen"),
            Error::NotUnderstoodExtension(name) => {
                write!(f, "Required WSDL extension not understood: {}", name)
            }
            // Negotiation
            Error::UnsupportedMediaType(Some(ct)) => write!(f, "Unsupported media type: {}", ct),
            Error::UnsupportedMediaType(None) => write!(f, "Unsupported media type: no content type"),
            Error::FastInfosetNotAccepted => write!(f, "Fast Infoset not accepted for decoding"),
            Error::MessageCreation(msg) => write!(f, "Message creation failed: {}", msg),
            Error::Malformed(msg) => write!(f, "Malformed message: {}", msg),
            // Pipeline
            Error::Tube { tube, message } => write!(f, "Tube '{}' failed: {}", tube, message),
            Error::TubePanicked(tube) => write!(f, "Tube '{}' panicked", tube),
            Error::IllegalAction(msg) => write!(f, "Illegal tube action: {}", msg),
            Error::Invocation(msg) => write!(f, "Invocation failed: {}", msg),
            Error::DispatchFailed(msg) => write!(f, "Cannot dispatch request: {}", msg),
            Error::MustUnderstand(name) => write!(f, "Header not understood: {}", name),
            Error::PoolMismatch {
                issued_by,
                returned_to,
            } => write!(
                f,
                "Pooled item issued by pool #{} returned to pool #{}",
                issued_by, returned_to
            ),
            Error::InvalidFiberState(msg) => write!(f, "Invalid fiber state: {}", msg),
            Error::Disposed => write!(f, "Endpoint disposed"),
            // Configuration
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::UnknownTube(name) => write!(f, "Unknown tube factory: {}", name),
            Error::NoDatabindingFactory => write!(f, "No databinding factories found"),
            Error::UnknownDatabindingMode(mode) => write!(f, "Unknown databinding mode: {}", mode),
            Error::Databinding(msg) => write!(f, "Databinding error: {}", msg),
            // I/O
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Malformed(e.to_string())
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_errors_pass_through() {
        let err = Error::UnsupportedMediaType(None).into_message_error();
        assert!(matches!(err, Error::UnsupportedMediaType(None)));

        let err = Error::FastInfosetNotAccepted.into_message_error();
        assert!(matches!(err, Error::FastInfosetNotAccepted));
    }

    #[test]
    fn test_other_errors_are_wrapped() {
        let err = Error::Malformed("unexpected EOF".into()).into_message_error();
        match err {
            Error::MessageCreation(msg) => assert!(msg.contains("unexpected EOF")),
            other => panic!("expected MessageCreation, got {:?}", other),
        }
    }

    #[test]
    fn test_fault_side_classification() {
        assert!(Error::Malformed("x".into()).is_sender_fault());
        assert!(!Error::Invocation("boom".into()).is_sender_fault());
        assert!(!Error::TubePanicked("dump".into()).is_sender_fault());
    }
}
