//! Failure trace
//!
//! A failure carries a chain of nested causes, outermost first.
//! Rendering writes one message per line and never fails on its own:
//! a cause that cannot be inspected is rendered as `Unknown exception` and ends the chain.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::Write;

/// Placeholder line of an opaque cause.
pub const UNKNOWN_CAUSE: &str = "Unknown exception";

/// Nested cause of a [`Failure`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cause
{
    /// Another failure, whose message and causes are known.
    Nested(Box<Failure>),
    /// A cause whose content is not available.
    Unknown,
}

/// Failure with an optional chain of causes.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure
{
    message: String,
    cause: Option<Cause>,
}

impl Failure
{
    /// Creates a failure without a cause.
    pub fn new<S: Into<String>>(message: S) -> Self
    {
        Failure {
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches `cause` as the nested cause, replacing any previous one.
    pub fn with_cause(mut self, cause: Failure) -> Self
    {
        self.cause = Some(Cause::Nested(Box::new(cause)));
        self
    }

    /// Attaches an opaque nested cause.
    pub fn with_unknown_cause(mut self) -> Self
    {
        self.cause = Some(Cause::Unknown);
        self
    }

    /// Wraps `self` as the cause of a new outer failure.
    pub fn context<S: Into<String>>(self, message: S) -> Self
    {
        Failure::new(message).with_cause(self)
    }

    /// Captures an error and its whole `source()` chain.
    ///
    /// Every message is kept; nothing is collapsed to a placeholder here.
    #[cfg(feature = "std")]
    pub fn from_error(e: &(dyn std::error::Error + 'static)) -> Self
    {
        use alloc::string::ToString;
        use alloc::vec::Vec;

        let mut messages = Vec::new();
        let mut cur = Some(e);
        while let Some(err) = cur {
            messages.push(err.to_string());
            cur = err.source();
        }

        let mut failure: Option<Failure> = None;
        for message in messages.into_iter().rev() {
            let outer = Failure::new(message);
            failure = Some(match failure {
                Some(inner) => outer.with_cause(inner),
                None => outer,
            });
        }

        failure.unwrap_or_else(|| Failure::new(""))
    }

    /// Message of this layer.
    pub fn message(&self) -> &str
    {
        &self.message
    }

    /// Nested cause of this layer.
    pub fn cause(&self) -> Option<&Cause>
    {
        self.cause.as_ref()
    }

    /// Number of layers including `self`, not counting an opaque cause.
    pub fn depth(&self) -> usize
    {
        let mut n = 1;
        let mut cur = self;
        while let Some(Cause::Nested(inner)) = &cur.cause {
            n += 1;
            cur = inner;
        }
        n
    }
}

impl core::fmt::Display for Failure
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result
    {
        f.write_str(&self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Failure
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        match &self.cause {
            Some(Cause::Nested(inner)) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

//

/// Writes the trace of `failure` to `w`, one line per layer.
pub fn write_to<W: Write>(w: &mut W, failure: &Failure) -> core::fmt::Result
{
    let mut cur = failure;
    loop {
        writeln!(w, "{}", cur.message)?;

        match &cur.cause {
            None => return Ok(()),
            Some(Cause::Unknown) => return writeln!(w, "{}", UNKNOWN_CAUSE),
            Some(Cause::Nested(inner)) => cur = inner,
        }
    }
}

/// Renders the trace of `failure` into a string, one line per layer.
pub fn to_string(failure: &Failure) -> String
{
    let mut s = String::new();
    // writing into a String never fails
    let _ = write_to(&mut s, failure);
    s
}

//

#[test]
fn test_trace1()
{
    let f = Failure::new("inner")
        .context("middle")
        .context("outer");

    assert_eq!(f.depth(), 3);
    assert_eq!(to_string(&f), "outer\nmiddle\ninner\n");

    let g = Failure::new("only").with_unknown_cause();
    assert_eq!(to_string(&g), "only\nUnknown exception\n");
}
