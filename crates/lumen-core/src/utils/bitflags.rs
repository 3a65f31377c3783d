// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A macro to define bitflags in a structured way.

/// Declares a transparent bit-set type with named constants.
///
/// The generated type keeps unknown bits, supports the usual set operators and
/// prints the names of the flags it contains in its `Debug` output.
#[macro_export]
#[doc(hidden)]
macro_rules! lumen_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            pub(crate) bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Creates a new bitflag set from the given raw bits.
            /// Bits not corresponding to any defined flag are kept.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw value of the bitflag set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if all flags in `other` are contained within `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is contained within `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Inserts the flags in `other` into `self`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the flags in `other` from `self`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Returns a new `Self` with `other` flags inserted.
            #[must_use]
            pub const fn with(mut self, other: Self) -> Self {
                self.bits |= other.bits;
                self
            }

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut bits = self.bits;
                let mut first_flag = true;

                write!(f, "{} {{ ", stringify!($name))?;

                $(
                    if ($flag_value != 0) && (bits & $flag_value) == $flag_value {
                        if !first_flag {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        bits &= !$flag_value;
                        first_flag = false;
                    }
                )*

                if bits != 0 {
                    if !first_flag {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", bits)?;
                    first_flag = false;
                }

                if self.bits == 0 && first_flag {
                    write!(f, "EMPTY")?;
                }

                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::lumen_bitflags;

    lumen_bitflags! {
        /// Flags used to exercise the macro.
        pub struct PassFlags: u32 {
            const LOG = 1 << 0;
            const REDUCE = 1 << 1;
            const TONE_MAP = 1 << 2;
            const BRIGHT = 1 << 3;
        }
    }

    #[test]
    fn test_empty_flags() {
        let flags = PassFlags::EMPTY;
        assert_eq!(flags.bits(), 0);
        assert!(flags.contains(PassFlags::EMPTY));
        assert!(!flags.contains(PassFlags::LOG));
        assert_eq!(PassFlags::default().bits(), 0, "Default should be empty");
        assert_eq!(format!("{:?}", flags), "PassFlags { EMPTY }");
    }

    #[test]
    fn test_multiple_flags() {
        let flags = PassFlags::LOG | PassFlags::TONE_MAP;
        assert_eq!(flags.bits(), 0b101);
        assert!(flags.contains(PassFlags::LOG));
        assert!(!flags.contains(PassFlags::REDUCE));
        assert!(flags.intersects(PassFlags::TONE_MAP | PassFlags::BRIGHT));
        assert_eq!(format!("{:?}", flags), "PassFlags { LOG | TONE_MAP }");
    }

    #[test]
    fn test_insert_remove_and_with() {
        let mut flags = PassFlags::REDUCE;
        flags.insert(PassFlags::BRIGHT);
        assert!(flags.contains(PassFlags::REDUCE | PassFlags::BRIGHT));
        flags.remove(PassFlags::REDUCE);
        assert_eq!(flags, PassFlags::BRIGHT);
        assert_eq!(flags.with(PassFlags::LOG).bits(), 0b1001);
    }

    #[test]
    fn test_unknown_bits_are_kept() {
        let flags = PassFlags::LOG | PassFlags::from_bits_truncate(1 << 8);
        assert_eq!(format!("{:?}", flags), "PassFlags { LOG | UNKNOWN(0x100) }");
        assert_eq!((flags & PassFlags::LOG), PassFlags::LOG);
    }
}
