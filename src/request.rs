/// A caller whose identity came out of a verified token.
///
/// There is no public constructor: the only way to obtain a `Principal` is
/// [`TokenService::verify`](crate::TokenService::verify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
}

impl Principal {
    pub(crate) fn new(subject: String) -> Self {
        Self { subject }
    }

    /// The subject identifier assigned by the credential store.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
