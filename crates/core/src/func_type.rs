use crate::ValType;
use core::fmt;
use std::sync::Arc;

/// A function type representing a function's parameter and result types.
///
/// # Note
///
/// Can be cloned cheaply. Structural equality over the parameter and result
/// type vectors makes [`FuncType`] suitable for deduplicating interning.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FuncType {
    /// The number of function parameters.
    len_params: usize,
    /// The ordered and merged parameter and result types of the function.
    ///
    /// The parameters and results are ordered and merged in a single
    /// shared slice starting with parameters.
    params_results: Arc<[ValType]>,
}

impl fmt::Debug for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncType")
            .field("params", &self.params())
            .field("results", &self.results())
            .finish()
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        let mut first = true;
        for param in self.params() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
            first = false;
        }
        write!(f, ")")?;
        if let [results @ .., last] = self.results() {
            write!(f, " -> ")?;
            if !results.is_empty() {
                write!(f, "(")?;
            }
            for result in results {
                write!(f, "{result}, ")?;
            }
            write!(f, "{last}")?;
            if !results.is_empty() {
                write!(f, ")")?;
            }
        }
        Ok(())
    }
}

impl FuncType {
    /// Creates a new [`FuncType`].
    pub fn new<P, R>(params: P, results: R) -> Self
    where
        P: IntoIterator<Item = ValType>,
        R: IntoIterator<Item = ValType>,
    {
        let mut params_results = params.into_iter().collect::<Vec<_>>();
        let len_params = params_results.len();
        params_results.extend(results);
        Self {
            params_results: params_results.into(),
            len_params,
        }
    }

    /// Returns the parameter types of the function type.
    pub fn params(&self) -> &[ValType] {
        &self.params_results[..self.len_params]
    }

    /// Returns the result types of the function type.
    pub fn results(&self) -> &[ValType] {
        &self.params_results[self.len_params..]
    }

    /// Returns the number of parameter types of the function type.
    pub fn len_params(&self) -> usize {
        self.len_params
    }

    /// Returns the number of result types of the function type.
    pub fn len_results(&self) -> usize {
        self.params_results.len() - self.len_params
    }

    /// Returns the pair of parameter and result types of the function type.
    pub fn params_results(&self) -> (&[ValType], &[ValType]) {
        self.params_results.split_at(self.len_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_consistent() {
        let ty = FuncType::new([ValType::I32, ValType::F64], [ValType::I64]);
        assert_eq!(ty.params(), &[ValType::I32, ValType::F64]);
        assert_eq!(ty.results(), &[ValType::I64]);
        assert_eq!(ty.len_params(), 2);
        assert_eq!(ty.len_results(), 1);
    }

    #[test]
    fn structural_equality() {
        let a = FuncType::new([ValType::I32], [ValType::I32]);
        let b = FuncType::new([ValType::I32], [ValType::I32]);
        let c = FuncType::new([ValType::I32], []);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
