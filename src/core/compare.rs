// Relational operators and the single generic ordering routine every typed comparison uses.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Eq,
        CompareOp::Ne,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
        }
    }

    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Gt => ordering.is_gt(),
            CompareOp::Ge => ordering.is_ge(),
            CompareOp::Lt => ordering.is_lt(),
            CompareOp::Le => ordering.is_le(),
            CompareOp::Eq => ordering.is_eq(),
            CompareOp::Ne => ordering.is_ne(),
        }
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        CompareOp::ALL
            .into_iter()
            .find(|op| op.symbol() == input)
            .ok_or_else(|| {
                Error::new(ErrorKind::UnsupportedOperator)
                    .with_message("unknown comparison operator")
                    .with_hint("Use one of >, >=, <, <=, =, <>.")
                    .with_input(input)
            })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

pub fn compare<T: Ord + ?Sized>(op: CompareOp, lhs: &T, rhs: &T) -> bool {
    op.holds(lhs.cmp(rhs))
}

/// Floats under a total order: `NaN` sorts first and equals itself, `-0.0 == 0.0`.
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat<F>(pub F);

macro_rules! ordered_float {
    ($ty:ty) => {
        impl Ord for OrderedFloat<$ty> {
            fn cmp(&self, other: &Self) -> Ordering {
                match (self.0.is_nan(), other.0.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
                }
            }
        }

        impl PartialOrd for OrderedFloat<$ty> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl PartialEq for OrderedFloat<$ty> {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other).is_eq()
            }
        }

        impl Eq for OrderedFloat<$ty> {}
    };
}

ordered_float!(f32);
ordered_float!(f64);

#[cfg(test)]
mod tests {
    use super::{CompareOp, OrderedFloat, compare};
    use crate::core::error::ErrorKind;

    #[test]
    fn operator_symbols_round_trip() {
        for op in CompareOp::ALL {
            assert_eq!(op.symbol().parse::<CompareOp>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        for input in ["==", "!=", "", " >", "gt"] {
            let err = input.parse::<CompareOp>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedOperator);
        }
    }

    #[test]
    fn generic_compare_covers_all_operators() {
        let expected = [
            (CompareOp::Gt, [false, false, true]),
            (CompareOp::Ge, [false, true, true]),
            (CompareOp::Lt, [true, false, false]),
            (CompareOp::Le, [true, true, false]),
            (CompareOp::Eq, [false, true, false]),
            (CompareOp::Ne, [true, false, true]),
        ];
        for (op, [below, equal, above]) in expected {
            assert_eq!(compare(op, &4, &5), below, "{op} below");
            assert_eq!(compare(op, &5, &5), equal, "{op} equal");
            assert_eq!(compare(op, &6, &5), above, "{op} above");
        }
        assert!(compare(CompareOp::Lt, "apple", "banana"));
    }

    #[test]
    fn float_order_is_total() {
        let nan = OrderedFloat(f64::NAN);
        assert!(compare(CompareOp::Eq, &nan, &nan));
        assert!(compare(CompareOp::Lt, &nan, &OrderedFloat(f64::NEG_INFINITY)));
        assert!(compare(CompareOp::Eq, &OrderedFloat(-0.0f32), &OrderedFloat(0.0f32)));
        assert!(compare(CompareOp::Gt, &OrderedFloat(1.5f32), &OrderedFloat(1.25f32)));
    }
}
