use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "tdl-dev",
            Profile::Prod => "tdl",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "tdl-dev" instead of "tdl"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tdl", profile.app_name()).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "tdl-dev" instead of "tdl"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tdl", profile.app_name()).map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Parse a 24-hour time of day (HH:MM)
pub fn parse_time(time_str: &str) -> Result<chrono::NaiveTime, chrono::ParseError> {
    chrono::NaiveTime::parse_from_str(time_str.trim(), "%H:%M")
}

/// Current local wall-clock time, the reference for past-date checks
pub fn local_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn parses_form_values() {
        assert_eq!(
            parse_date("2025-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        assert!(parse_date("31/01/2025").is_err());
        assert_eq!(
            parse_time("00:05").unwrap(),
            NaiveTime::from_hms_opt(0, 5, 0).unwrap()
        );
        assert!(parse_time("9:00 AM").is_err());
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_path("/tmp/tdl.db"), PathBuf::from("/tmp/tdl.db"));
    }
}
