//! Either result
//!
//! Holds exactly one of a `Left` (accumulated errors) or a `Right`
//! (success value). Reading the wrong side is a programmer error and
//! panics with an invariant violation.

use crate::Error;

/// Either a `Left` or a `Right`, never both and never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    /// True for the `Left` variant.
    pub fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// True for the `Right` variant.
    pub fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// The `Left` value, if this is a `Left`.
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// The `Right` value, if this is a `Right`.
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Take the `Left` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] when called on a `Right`.
    pub fn try_left(self) -> crate::Result<L> {
        self.left().ok_or_else(|| {
            Error::InvariantViolation("attempt to read Left from Right".to_string())
        })
    }

    /// Take the `Right` value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] when called on a `Left`.
    pub fn try_right(self) -> crate::Result<R> {
        self.right().ok_or_else(|| {
            Error::InvariantViolation("attempt to read Right from Left".to_string())
        })
    }

    /// Take the `Left` value.
    ///
    /// # Panics
    ///
    /// Panics when called on a `Right`.
    #[track_caller]
    pub fn unwrap_left(self) -> L {
        match self.try_left() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Take the `Right` value.
    ///
    /// # Panics
    ///
    /// Panics when called on a `Left`.
    #[track_caller]
    pub fn unwrap_right(self) -> R {
        match self.try_right() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Borrow both sides.
    pub fn as_ref(&self) -> Either<&L, &R> {
        match self {
            Self::Left(value) => Either::Left(value),
            Self::Right(value) => Either::Right(value),
        }
    }

    /// Transform the `Right` value, leaving a `Left` untouched.
    pub fn map_right<T>(self, f: impl FnOnce(R) -> T) -> Either<L, T> {
        match self {
            Self::Left(value) => Either::Left(value),
            Self::Right(value) => Either::Right(f(value)),
        }
    }

    /// Convert into a `Result`, treating `Left` as the error side.
    pub fn into_result(self) -> std::result::Result<R, L> {
        match self {
            Self::Left(value) => Err(value),
            Self::Right(value) => Ok(value),
        }
    }
}

impl<L, R> From<std::result::Result<R, L>> for Either<L, R> {
    fn from(result: std::result::Result<R, L>) -> Self {
        match result {
            Ok(value) => Self::Right(value),
            Err(value) => Self::Left(value),
        }
    }
}

/// Wrap a value as `Left`.
pub fn mk_left<L, R>(value: L) -> Either<L, R> {
    Either::Left(value)
}

/// Wrap a value as `Right`.
pub fn mk_right<L, R>(value: R) -> Either<L, R> {
    Either::Right(value)
}

/// True when `either` is a `Left`.
#[must_use]
pub fn is_left<L, R>(either: &Either<L, R>) -> bool {
    either.is_left()
}

/// True when `either` is a `Right`.
#[must_use]
pub fn is_right<L, R>(either: &Either<L, R>) -> bool {
    either.is_right()
}

/// Read the `Left` value.
///
/// # Panics
///
/// Panics when `either` is a `Right`.
#[track_caller]
pub fn left<L, R>(either: Either<L, R>) -> L {
    either.unwrap_left()
}

/// Read the `Right` value.
///
/// # Panics
///
/// Panics when `either` is a `Left`.
#[track_caller]
pub fn right<L, R>(either: Either<L, R>) -> R {
    either.unwrap_right()
}
