//! Messaging

use compstep_core::trace::{self, Failure};

/// Messaging trait
///
/// Where the solver sends its iteration table and diagnostics report,
/// and how it ends on a failure it cannot turn into a stopping reason.
pub trait Messaging
{
    /// Emits an informational line.
    fn print(&self, msg: &str);

    /// Emits a fatal failure.
    ///
    /// Returns the failure for the solver to hand back to its caller,
    /// unless the implementation terminates the process.
    fn error(&self, failure: Failure) -> Failure;
}

impl<M: Messaging + ?Sized> Messaging for &M
{
    fn print(&self, msg: &str)
    {
        (**self).print(msg)
    }

    fn error(&self, failure: Failure) -> Failure
    {
        (**self).error(failure)
    }
}

//

/// Messaging to the standard output.
///
/// [`Messaging::error`] writes the failure trace to the standard error and exits the process.
pub struct StdMessaging;

impl Messaging for StdMessaging
{
    fn print(&self, msg: &str)
    {
        println!("{}", msg);
    }

    fn error(&self, failure: Failure) -> Failure
    {
        eprint!("{}", trace::to_string(&failure));
        std::process::exit(1)
    }
}

//

/// Messaging through the `log` crate.
///
/// Lines go to `log::info!`, the failure trace to `log::error!` line by line,
/// and [`Messaging::error`] returns the failure instead of exiting.
pub struct LogMessaging;

impl Messaging for LogMessaging
{
    fn print(&self, msg: &str)
    {
        log::info!("{}", msg);
    }

    fn error(&self, failure: Failure) -> Failure
    {
        for line in trace::to_string(&failure).lines() {
            log::error!("{}", line);
        }
        failure
    }
}
