//! Read-time memoization of derived text.

mod keys;
pub(crate) mod lock;
mod memo;

pub use keys::MemoKey;
pub use memo::DerivedTextMemo;
pub(crate) use memo::{METRIC_MEMO_HIT, METRIC_MEMO_MISS};
