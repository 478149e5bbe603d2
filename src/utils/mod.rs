use std::path::Path;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime, Utc};
use tokio::fs;

/// 将耗时格式化为 `HH:MM:SS`
pub fn format_hms(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, remainder) = (total / 3600, total % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// 按部署时区偏移得到的当前本地时间
pub fn local_now(utc_offset_hours: i32) -> NaiveDateTime {
    let now = Utc::now();
    match utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
    {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => now.naive_utc(),
    }
}

/// 默认任务名：`YYYY-MM-DD HH:MM:SS`
pub fn timestamp_name(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub async fn file_exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

pub async fn save_file(path: impl AsRef<Path>, data: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_hms(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_hms(Duration::from_millis(61_900)), "00:01:01");
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "03:25:07");
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        for hours in [i32::MAX, i32::MIN, 25, -25] {
            let before = Utc::now().naive_utc();
            let local = local_now(hours);
            let after = Utc::now().naive_utc();
            assert!(before <= local && local <= after);
        }
    }

    #[test]
    fn timestamp_name_layout() {
        let time = NaiveDateTime::parse_from_str("2024-05-01 08:03:09", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(timestamp_name(&time), "2024-05-01 08:03:09");
    }
}
