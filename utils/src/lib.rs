use std::{fmt, io::BufRead, str::FromStr};

use anyhow::Context;
use clap::ArgMatches;

/// LogLevel
///
/// Represents minimum level of messages that will be logged
///
#[derive(Debug, Clone, Copy)]
pub struct LogLevel {
    pub level: usize,
}

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel { level: 0 }),
            "warn" => Ok(LogLevel { level: 1 }),
            "info" => Ok(LogLevel { level: 2 }),
            "debug" => Ok(LogLevel { level: 3 }),
            "trace" => Ok(LogLevel { level: 4 }),
            "none" => Ok(LogLevel { level: 5 }),
            _ => Err("no match"),
        }
    }
}

impl LogLevel {
    pub fn is_none(&self) -> bool {
        self.level > 4
    }
    pub fn get_level(&self) -> usize {
        if self.level > 4 {
            0
        } else {
            self.level
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level_str = ["error", "warn", "info", "debug", "trace", "none"];
        if self.level < 6 {
            write!(f, "{}", level_str[self.level])
        } else {
            write!(f, "unknown")
        }
    }
}

/// Initialize logging from command line arguments
pub fn init_log(m: &ArgMatches) -> anyhow::Result<()> {
    let verbose = m
        .get_one::<LogLevel>("loglevel")
        .copied()
        .unwrap_or(LogLevel { level: 2 });
    let quiet = verbose.is_none() || m.get_flag("quiet");
    let ts = m
        .get_one::<stderrlog::Timestamp>("timestamp")
        .copied()
        .unwrap_or(stderrlog::Timestamp::Off);

    stderrlog::new()
        .quiet(quiet)
        .verbosity(verbose.get_level())
        .timestamp(ts)
        .init()
        .with_context(|| "Could not initialize logging")
}

/// Read in next line and split on tabs after trimming white space
pub fn get_next_line<'a, R: BufRead>(
    rdr: &mut R,
    buf: &'a mut String,
) -> anyhow::Result<Option<Vec<&'a str>>> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(buf.trim().split('\t').collect()))
    }
}

/// Parse column `ix` of a split input line, naming the column in any error
pub fn parse_field<T>(fields: &[&str], ix: usize, name: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s = fields
        .get(ix)
        .ok_or_else(|| anyhow::anyhow!("Missing {} (column {})", name, ix + 1))?;
    s.trim()
        .parse::<T>()
        .with_context(|| format!("Error reading {} from '{}'", name, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn log_level_from_str() {
        assert_eq!(LogLevel::from_str("INFO").unwrap().get_level(), 2);
        assert!(LogLevel::from_str("none").unwrap().is_none());
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn next_line_splits_on_tabs() {
        let mut rdr = Cursor::new("a\tb\tc  \n\nlast");
        let mut buf = String::new();
        assert_eq!(
            get_next_line(&mut rdr, &mut buf).unwrap(),
            Some(vec!["a", "b", "c"])
        );
        assert_eq!(get_next_line(&mut rdr, &mut buf).unwrap(), Some(vec![""]));
        assert_eq!(get_next_line(&mut rdr, &mut buf).unwrap(), Some(vec!["last"]));
        assert_eq!(get_next_line(&mut rdr, &mut buf).unwrap(), None);
    }

    #[test]
    fn parse_field_reports_column() {
        let fields = ["12", "x"];
        assert_eq!(parse_field::<usize>(&fields, 0, "count").unwrap(), 12);
        assert!(parse_field::<usize>(&fields, 1, "count").is_err());
        let e = parse_field::<usize>(&fields, 3, "count").unwrap_err();
        assert!(e.to_string().contains("column 4"));
    }
}
