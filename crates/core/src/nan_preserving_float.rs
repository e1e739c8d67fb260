use core::fmt::{self, Display};

macro_rules! float {
    (
        $( #[$docs:meta] )*
        struct $name:ident($prim:ty as $bits:ty);
    ) => {
        $( #[$docs] )*
        ///
        /// Unlike the underlying primitive this wrapper stores the raw bit
        /// pattern so that NaN payloads survive conversions in both
        /// directions.
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name($bits);

        impl $name {
            /// Creates a float from its underlying bits.
            pub const fn from_bits(bits: $bits) -> Self {
                Self(bits)
            }

            /// Returns the underlying bits of the float.
            pub const fn to_bits(self) -> $bits {
                self.0
            }

            /// Creates a float from the primitive float type.
            pub fn from_float(value: $prim) -> Self {
                Self::from_bits(value.to_bits())
            }

            /// Returns the primitive float type.
            pub fn to_float(self) -> $prim {
                <$prim>::from_bits(self.to_bits())
            }

            /// Returns `true` if the float is NaN.
            pub fn is_nan(self) -> bool {
                self.to_float().is_nan()
            }
        }

        impl From<$prim> for $name {
            fn from(value: $prim) -> Self {
                Self::from_float(value)
            }
        }

        impl From<$name> for $prim {
            fn from(value: $name) -> Self {
                value.to_float()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                Display::fmt(&self.to_float(), f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(&self.to_float(), f)
            }
        }
    };
}

float! {
    /// A 32-bit IEEE 754-2008 floating point number.
    struct F32(f32 as u32);
}

float! {
    /// A 64-bit IEEE 754-2008 floating point number.
    struct F64(f64 as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_nan_payload() {
        let bits = 0x7FC0_1234;
        let value = F32::from_bits(bits);
        assert!(value.is_nan());
        assert_eq!(F32::from(value.to_float()).to_bits(), bits);
    }
}
