//! Operator boilerplate for single-field tuple newtypes.

/// Implements the standard operator traits for a newtype wrapping a single numeric field.
///
/// * `binary` covers `Add`-style traits (`Self ⊕ Self -> Self`),
/// * `inplace` covers `AddAssign`-style traits,
/// * `unary` covers `Neg`-style traits.
#[macro_export]
macro_rules! op {
    (binary $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $ty:ident, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
