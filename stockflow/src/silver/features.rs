//! Derived-feature expressions.

use polars::prelude::*;

/// Value of `risk_profile` that maps to the high-risk category.
pub const HIGH_RISK_PROFILE: &str = "High";

/// Short moving-average window, written as `ma_5`.
pub const SHORT_WINDOW: usize = 5;

/// Long moving-average window, written as `ma_20`.
pub const LONG_WINDOW: usize = 20;

/// `"High Risk"` when `risk_profile` is exactly `High`, otherwise
/// `"Low Risk"`.
#[must_use]
pub fn risk_category() -> Expr {
    when(col("risk_profile").cast(DataType::String).eq(lit(HIGH_RISK_PROFILE)))
        .then(lit("High Risk"))
        .otherwise(lit("Low Risk"))
        .alias("risk_category")
}

/// Relative change from open to close.
///
/// A zero open gives `±inf`, or `NaN` when the close is zero too.
#[must_use]
pub fn daily_return() -> Expr {
    ((col("close_price") - col("open_price")) / col("open_price")).alias("daily_return")
}

/// Trailing mean of `value` over `window` rows, computed separately within
/// each `group` in row order.
///
/// The first `window - 1` rows of every group are null.
#[must_use]
pub fn grouped_rolling_mean(value: &str, group: &str, window: usize) -> Expr {
    let options = RollingOptionsFixedWindow {
        window_size: window,
        ..Default::default()
    };
    // Rows seen so far in the group, capped at the window size.
    let filled = col(value)
        .is_not_null()
        .cast(DataType::Float64)
        .rolling_sum(options.clone())
        .over([col(group)]);
    #[allow(clippy::cast_precision_loss)]
    let full = filled.eq(lit(window as f64));
    when(full)
        .then(col(value).rolling_mean(options).over([col(group)]))
        .otherwise(lit(NULL))
}
