use std::ops::Deref;

use crate::value::Value;

/// The result of a variable lookup: usually a borrow out of the context,
/// but owned for synthesized values like `loop.index`.
pub(crate) enum ValueCow<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl Deref for ValueCow<'_> {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(v) => v,
            Self::Owned(v) => v,
        }
    }
}
