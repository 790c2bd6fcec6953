use std::marker::PhantomData;

use crate::component::{Component, ComponentInfo};

/// Trait for query filters: components that constrain which entities match
/// without fetching any data.
///
/// Tag components are requested this way, since they carry nothing to fetch.
/// Implemented for `()`, [`Contains`] and tuples of filters up to length 8.
pub trait QueryFilter {
    /// Appends the components this filter requires.
    fn components(out: &mut Vec<ComponentInfo>);
}

/// Filter matching entities that possess `C`.
pub struct Contains<C: Component>(PhantomData<C>);

impl QueryFilter for () {
    fn components(_out: &mut Vec<ComponentInfo>) {}
}

impl<C: Component> QueryFilter for Contains<C> {
    fn components(out: &mut Vec<ComponentInfo>) {
        out.push(ComponentInfo::of::<C>());
    }
}

macro_rules! tuple_impl {
    ($($f:ident),+) => {
        impl<$($f: QueryFilter),+> QueryFilter for ($($f,)+) {
            fn components(out: &mut Vec<ComponentInfo>) {
                $($f::components(out);)+
            }
        }
    };
}

tuple_impl!(F0);
tuple_impl!(F0, F1);
tuple_impl!(F0, F1, F2);
tuple_impl!(F0, F1, F2, F3);
tuple_impl!(F0, F1, F2, F3, F4);
tuple_impl!(F0, F1, F2, F3, F4, F5);
tuple_impl!(F0, F1, F2, F3, F4, F5, F6);
tuple_impl!(F0, F1, F2, F3, F4, F5, F6, F7);
