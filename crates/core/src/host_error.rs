use core::fmt::{Debug, Display};
use downcast_rs::{impl_downcast, DowncastSync};

/// Trait that allows the host to return custom errors from host functions.
///
/// It should be useful for representing custom traps, i/o errors and so on.
///
/// # Examples
///
/// ```rust
/// use std::fmt;
/// use wasmlet_core::HostError;
///
/// #[derive(Debug)]
/// struct MyError {
///     code: u32,
/// }
///
/// impl fmt::Display for MyError {
///     fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
///         write!(f, "MyError, code={}", self.code)
///     }
/// }
///
/// impl HostError for MyError {}
/// ```
pub trait HostError: 'static + Display + Debug + DowncastSync {}
impl_downcast!(sync HostError);
