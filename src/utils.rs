use crate::entities::StatusServerResponse;
use byte_unit::{Byte, UnitType};

impl StatusServerResponse {
    /// Download speed in a human-readable form, e.g. `(1.05 MB/s)`.
    /// Empty when nothing is being downloaded.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn calculate_speed(&self) -> String {
        if self.speed <= 0.0 {
            return String::new();
        }

        let speed = Byte::from(self.speed as u64);
        format!("({:#.2}/s)", speed.get_appropriate_unit(UnitType::Decimal))
    }

    /// Download speed in megabit per second, rounded to two decimals
    #[must_use]
    pub fn speed_mbit(&self) -> f64 {
        (self.speed * 8.0 / 10_000.0).round() / 100.0
    }

    /// Whether the queue is running.
    /// Falls back to the pause flag for servers that omit `download`.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.download.unwrap_or(!self.pause)
    }
}

/// Free disk space in binary units, e.g. `14.65 GiB`
#[must_use]
pub fn format_free_space(bytes: u64) -> String {
    let size = Byte::from(bytes);
    format!("{:#.2}", size.get_appropriate_unit(UnitType::Binary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(speed: f64) -> StatusServerResponse {
        StatusServerResponse {
            pause: false,
            active: 10,
            queue: 5,
            speed,
            total: Some(15),
            download: None,
            reconnect: Some(false),
            captcha: None,
        }
    }

    #[test]
    fn test_calculate_speed() {
        assert_eq!("(1.05 MB/s)", status(1_048_576.0).calculate_speed());
        assert_eq!("", status(0.0).calculate_speed());
    }

    #[test]
    fn test_speed_mbit() {
        assert!((status(9_999_999.0).speed_mbit() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_downloading() {
        let mut status = status(0.0);
        assert!(status.is_downloading());
        status.pause = true;
        assert!(!status.is_downloading());
        status.download = Some(true);
        assert!(status.is_downloading());
    }

    #[test]
    fn test_format_free_space() {
        assert_eq!("14.65 GiB", format_free_space(15_728_640_000));
    }
}
