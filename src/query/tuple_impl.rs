use super::{EntityView, QueryData, QuerySource};
use crate::component::ComponentInfo;

macro_rules! tuple_impl {
    ($($d:ident),*) => {
        impl<$($d),*> QueryData for ($($d,)*)
        where
            $($d: QueryData),*
        {
            type Guards<'w> = ($($d::Guards<'w>,)*);
            type Item<'g> = ($($d::Item<'g>,)*);

            #[allow(unused)]
            fn components(out: &mut Vec<ComponentInfo>) {
                $($d::components(out);)*
            }

            #[allow(unused)]
            fn acquire<'w>(source: &QuerySource<'w>) -> Self::Guards<'w> {
                ($($d::acquire(source),)*)
            }

            #[allow(unused, non_snake_case, clippy::unused_unit)]
            fn get<'g>(
                guards: &'g mut Self::Guards<'_>,
                entity: EntityView<'_>,
            ) -> Self::Item<'g> {
                let ($($d,)*) = guards;

                ($($d::get($d, entity),)*)
            }
        }
    };
}

tuple_impl!();
tuple_impl!(D0);
tuple_impl!(D0, D1);
tuple_impl!(D0, D1, D2);
tuple_impl!(D0, D1, D2, D3);
tuple_impl!(D0, D1, D2, D3, D4);
tuple_impl!(D0, D1, D2, D3, D4, D5);
tuple_impl!(D0, D1, D2, D3, D4, D5, D6);
tuple_impl!(D0, D1, D2, D3, D4, D5, D6, D7);
