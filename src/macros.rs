/// Creates an [`ErrorInstance`] and records that it is being raised.
///
/// This macro can be invoked in two different ways, using a format string or
/// using an error value.
///
/// ## Using a format string
///
/// When invoked with a literal as the first argument, the arguments are
/// evaluated in the same way as the [`format!()`] macro and the result becomes
/// the message of the new error.
///
/// [`format!()`]: std::format
///
/// ## Using an error value
///
/// Any other expression must evaluate to something implementing
/// [`core::error::Error`]. Its `Display` output becomes the message, as with
/// [`ErrorInstance::from_error`].
///
/// In both cases the raise is recorded with the globally installed unwinder.
///
/// [`ErrorInstance`]: crate::ErrorInstance
/// [`ErrorInstance::from_error`]: crate::ErrorInstance::from_error
///
/// # Examples
///
/// ```
/// use raisetrace::{ErrorInstance, raise};
///
/// fn withdraw(balance: u64, amount: u64) -> Result<u64, ErrorInstance> {
///     if amount > balance {
///         return Err(raise!("cannot withdraw {amount} from {balance}"));
///     }
///     Ok(balance - amount)
/// }
///
/// let error = withdraw(5, 10).unwrap_err();
/// assert_eq!(error.message(), "cannot withdraw 10 from 5");
///
/// let parse_error = "x".parse::<u8>().unwrap_err();
/// let error = raise!(parse_error);
/// assert_eq!(error.message(), "invalid digit found in string");
/// ```
#[macro_export]
macro_rules! raise {
    ($msg:literal $(,)?) => {
        $crate::ErrorInstance::new($crate::__private::format!($msg)).raised()
    };
    ($fmt:literal, $($arg:tt)+) => {
        $crate::ErrorInstance::new($crate::__private::format!($fmt, $($arg)+)).raised()
    };
    ($error:expr $(,)?) => {
        $crate::ErrorInstance::from_error(&$error).raised()
    };
}

#[cfg(test)]
mod tests {
    use crate::ErrorInstance;

    #[derive(Debug)]
    struct Timeout;

    impl core::fmt::Display for Timeout {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str("operation timed out")
        }
    }

    impl core::error::Error for Timeout {}

    #[test]
    fn test_raise_forms() {
        let error: ErrorInstance = raise!("plain");
        assert_eq!(error.message(), "plain");
        assert!(!error.is_singleton());

        let attempt = 3;
        let error = raise!("failed after {} attempts", attempt);
        assert_eq!(error.message(), "failed after 3 attempts");

        let error = raise!("inline {attempt}");
        assert_eq!(error.message(), "inline 3");

        let error = raise!(Timeout);
        assert_eq!(error.message(), "operation timed out");
    }
}
