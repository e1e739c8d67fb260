//! Typed indices referring into the merged import+local index spaces of the
//! executing frame's instance, and into the store's type interner.

macro_rules! for_each_index {
    ($mac:ident) => {
        $mac! {
            /// Index of a function in the instance's function space.
            Func(pub(crate) u32);
            /// Index of a table in the instance's table space.
            Table(pub(crate) u32);
            /// Index of a global variable in the instance's global space.
            Global(pub(crate) u32);
            /// Index of a data segment in the instance's data segment space.
            Data(pub(crate) u32);
            /// Index of an element segment in the instance's element segment space.
            Elem(pub(crate) u32);
            /// Dense identifier of an interned function type.
            Sig(pub(crate) u32);
        }
    };
}

macro_rules! define_index {
    (
        $(
            $( #[$docs:meta] )*
            $name:ident($vis:vis $ty:ty);
        )*
    ) => {
        $(
            $( #[$docs] )*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
            #[repr(transparent)]
            pub struct $name($vis $ty);

            impl From<$ty> for $name {
                fn from(index: $ty) -> Self {
                    Self(index)
                }
            }

            impl From<$name> for $ty {
                fn from(index: $name) -> Self {
                    index.0
                }
            }
        )*
    };
}
for_each_index!(define_index);
