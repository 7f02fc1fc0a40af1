//! Comparisons reduce to a single truth value: whether every element pair
//! satisfies the relation.

use crate::config::OpConfig;
use crate::element::Element;
use crate::error::Result;
use crate::resolve::BinaryCall;

pub(crate) trait Relation {
    const NAME: &'static str;
    fn holds<T: PartialOrd>(x: T, y: T) -> bool;
}

pub(crate) struct Equal;
pub(crate) struct NotEqual;
pub(crate) struct Less;
pub(crate) struct LessEqual;
pub(crate) struct Greater;
pub(crate) struct GreaterEqual;

macro_rules! relation {
    ($($kind:ident => $name:literal, $op:tt;)*) => {
        $(
            impl Relation for $kind {
                const NAME: &'static str = $name;

                #[inline]
                fn holds<T: PartialOrd>(x: T, y: T) -> bool {
                    x $op y
                }
            }
        )*
    };
}

relation! {
    Equal => "eq", ==;
    NotEqual => "ne", !=;
    Less => "lt", <;
    LessEqual => "le", <=;
    Greater => "gt", >;
    GreaterEqual => "ge", >=;
}

pub(crate) fn compare_cell<T: Element, K: Relation>(
    call: &BinaryCall<'_>,
    _config: &OpConfig,
) -> Result<bool> {
    let (x, y) = call.bind_read::<T>()?;
    // Read-only bindings never refer to a destination.
    let all = (0..call.desc.len).all(|index| K::holds(x.at(&[], index), y.at(&[], index)));
    tracing::trace!(op = K::NAME, result = all, "comparison finished");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_never_satisfies_an_ordering() {
        assert!(!Less::holds(f64::NAN, 1.0));
        assert!(!GreaterEqual::holds(f64::NAN, 1.0));
        assert!(!Equal::holds(f64::NAN, f64::NAN));
        assert!(NotEqual::holds(f64::NAN, f64::NAN));
    }
}
