//! Message representations accepted by transports
//!
//! A transport can be handed three kinds of work:
//! - [`SimpleMessage`]: plain addressing fields and a text body
//! - [`MimeMessage`]: an already built message with arbitrary headers
//! - [`Preparator`]: a callback that fills in a blank [`MimeMessage`]
//!
//! [`Outgoing`] wraps any one of them for callers that hold a mixed list.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::TransportError;

/// The closed set of representations a transport knows how to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    Simple,
    Mime,
    Preparator,
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simple => "simple",
            Self::Mime => "mime",
            Self::Preparator => "preparator",
        })
    }
}

/// A plain message with addressing fields and a text body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A fully built message: an ordered header list and a body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeMessage {
    #[serde(default)]
    headers: Vec<(String, String)>,
    #[serde(default)]
    body: String,
}

impl MimeMessage {
    /// Create a message with no headers and an empty body
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Look up a header value; names compare case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing the first existing header with the same name
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }
}

type PrepareFn = dyn Fn(&mut MimeMessage) -> Result<(), TransportError> + Send + Sync;

/// Callback that fills in a blank [`MimeMessage`] right before sending
#[derive(Clone)]
pub struct Preparator(Arc<PrepareFn>);

impl Preparator {
    pub fn new<F>(prepare: F) -> Self
    where
        F: Fn(&mut MimeMessage) -> Result<(), TransportError> + Send + Sync + 'static,
    {
        Self(Arc::new(prepare))
    }

    /// Run the callback against `message`
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback produced.
    pub fn prepare(&self, message: &mut MimeMessage) -> Result<(), TransportError> {
        (self.0)(message)
    }
}

impl fmt::Debug for Preparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Preparator(..)")
    }
}

/// A single item of any supported representation
///
/// Preparators cannot be read from configuration, so only the `Simple` and
/// `Mime` variants deserialize.
#[derive(Debug, Clone, Deserialize)]
pub enum Outgoing {
    Simple(SimpleMessage),
    Mime(MimeMessage),
    #[serde(skip)]
    Prepared(Preparator),
}

impl Outgoing {
    pub const fn kind(&self) -> RepresentationKind {
        match self {
            Self::Simple(_) => RepresentationKind::Simple,
            Self::Mime(_) => RepresentationKind::Mime,
            Self::Prepared(_) => RepresentationKind::Preparator,
        }
    }
}

impl From<SimpleMessage> for Outgoing {
    fn from(message: SimpleMessage) -> Self {
        Self::Simple(message)
    }
}

impl From<MimeMessage> for Outgoing {
    fn from(message: MimeMessage) -> Self {
        Self::Mime(message)
    }
}

impl From<Preparator> for Outgoing {
    fn from(preparator: Preparator) -> Self {
        Self::Prepared(preparator)
    }
}
