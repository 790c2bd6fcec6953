use std::sync::Arc;

use super::{Manager, ManagerCell};
use crate::schema::{Blueprint, Schema};

/// The wiring data of one supplied direct base.
pub struct BaseRef {
    pub(crate) blueprint: &'static Blueprint,
    pub(crate) domain: Vec<Arc<ManagerCell>>,
}

/// Trait for the direct bases passed to [`Manager::new`].
///
/// Implemented for a single base reference and for tuples of base references
/// up to length 8, matching the schema's base declaration order. Root
/// managers take the empty tuple.
pub trait BaseSet {
    fn collect(&self) -> Vec<BaseRef>;
}

impl BaseSet for () {
    fn collect(&self) -> Vec<BaseRef> {
        Vec::new()
    }
}

impl<B: Schema> BaseSet for &Manager<B> {
    fn collect(&self) -> Vec<BaseRef> {
        vec![BaseRef { blueprint: self.blueprint, domain: self.domain.clone() }]
    }
}

macro_rules! tuple_impl {
    ($(($b:ident, $index:tt)),*) => {
        impl<$($b: Schema),*> BaseSet for ($(&Manager<$b>,)*) {
            fn collect(&self) -> Vec<BaseRef> {
                vec![$(
                    BaseRef {
                        blueprint: self.$index.blueprint,
                        domain: self.$index.domain.clone(),
                    },
                )*]
            }
        }
    };
}

tuple_impl!((B0, 0));
tuple_impl!((B0, 0), (B1, 1));
tuple_impl!((B0, 0), (B1, 1), (B2, 2));
tuple_impl!((B0, 0), (B1, 1), (B2, 2), (B3, 3));
tuple_impl!((B0, 0), (B1, 1), (B2, 2), (B3, 3), (B4, 4));
tuple_impl!((B0, 0), (B1, 1), (B2, 2), (B3, 3), (B4, 4), (B5, 5));
tuple_impl!((B0, 0), (B1, 1), (B2, 2), (B3, 3), (B4, 4), (B5, 5), (B6, 6));
tuple_impl!(
    (B0, 0),
    (B1, 1),
    (B2, 2),
    (B3, 3),
    (B4, 4),
    (B5, 5),
    (B6, 6),
    (B7, 7)
);
