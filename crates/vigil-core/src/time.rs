//! 告警调度用到的时刻计算
//!
//! 一天中的时刻表示为距当天零点的 [`Duration`]，取值范围始终是 `[0, 24h)`。

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Timelike, Utc};
use std::time::Duration;
use tracing::warn;

/// 一天的长度
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// 自午夜起经过的时长
pub fn time_of_day(time: NaiveTime) -> Duration {
    Duration::new(
        u64::from(time.num_seconds_from_midnight()),
        time.nanosecond().min(999_999_999),
    )
}

/// 判断从 `last` 到 `current` 是否已经过去至少 `cooldown`
///
/// `current < last` 表示当前时刻已跨过午夜，经过时长按
/// `(24h - last) + current` 计算。边界包含在内：经过时长恰好等于
/// `cooldown` 时返回 true；`cooldown` 为 0 时总是返回 true。
pub fn is_cooldown_elapsed(last: NaiveTime, cooldown: Duration, current: NaiveTime) -> bool {
    if cooldown.is_zero() {
        return true;
    }

    let last = time_of_day(last);
    let current = time_of_day(current);
    let elapsed = if current >= last {
        current - last
    } else {
        (DAY - last) + current
    };

    elapsed >= cooldown
}

/// 判断 `current` 是否落在告警时间窗口内
///
/// - `start < end`：窗口为 `[start, end)`
/// - `start > end`：窗口跨越午夜，为 `[start, 24h) ∪ [0, end)`
/// - `start == end`：整天都在窗口内
pub fn is_within_window(start: NaiveTime, end: NaiveTime, current: NaiveTime) -> bool {
    if start == end {
        return true;
    }

    if start < end {
        start <= current && current < end
    } else {
        current >= start || current < end
    }
}

/// 将时间戳换算到指定的 IANA 时区
///
/// 时区缺失或无法识别时原样返回（UTC），不会报错。
pub fn in_timezone(timestamp: DateTime<Utc>, timezone: Option<&str>) -> DateTime<FixedOffset> {
    let utc = timestamp.with_timezone(&Utc.fix());

    let Some(name) = timezone.map(str::trim).filter(|name| !name.is_empty()) else {
        return utc;
    };

    match name.parse::<chrono_tz::Tz>() {
        Ok(tz) => {
            let local = timestamp.with_timezone(&tz);
            let offset = local.offset().fix();
            timestamp.with_timezone(&offset)
        }
        Err(e) => {
            warn!(timezone = %name, error = %e, "Unknown timezone, keeping UTC timestamp");
            utc
        }
    }
}
