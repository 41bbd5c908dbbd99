use std::fmt;

/// A client-supplied value that has not crossed the trust boundary.
///
/// Payloads decoded from a request body arrive as `Tainted<T>`. The only way
/// to get the value back out is crate-internal: the gateway unwraps it while
/// binding it to a verified identity (see
/// [`ReservationData::bind`](crate::gateway::ReservationData::bind)), which
/// discards any identity fields the client tried to set.
///
/// # Security Properties
///
/// - Does NOT implement `Deref` or any implicit conversion traits
/// - Inner value is inaccessible outside this crate
///
/// # Examples
///
/// ```
/// use mesh_gateway::Tainted;
///
/// let user_input = Tainted::new("'; DROP TABLE reservations; --".to_string());
/// println!("{:?}", user_input); // Tainted { inner: "'; DROP..." }
/// ```
#[derive(Clone)]
pub struct Tainted<T> {
    // This field MUST remain private.
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Extracts the inner value.
    ///
    /// Only boundary code that immediately validates the value and overwrites
    /// its identity fields may call this.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

// Do NOT add Deref, AsRef, Borrow, From<T>, or Into<T>.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}
