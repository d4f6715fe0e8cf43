//! Syslog facilities as defined by RFC 5424 section 6.2.1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source classification carried in the syslog PRI value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Facility {
    /// Kernel messages (0).
    Kern,
    /// User-level messages (1).
    #[default]
    User,
    /// Mail system (2).
    Mail,
    /// System daemons (3).
    Daemon,
    /// Security/authorization messages (4).
    Auth,
    /// Messages generated internally by syslogd (5).
    Syslog,
    /// Line printer subsystem (6).
    Lpr,
    /// Network news subsystem (7).
    News,
    /// UUCP subsystem (8).
    Uucp,
    /// Clock daemon (9).
    Cron,
    /// Security/authorization messages, private (10).
    Authpriv,
    /// FTP daemon (11).
    Ftp,
    /// NTP subsystem (12).
    Ntp,
    /// Log audit (13).
    Logaudit,
    /// Log alert (14).
    Logalert,
    /// Clock daemon (15).
    Clockd,
    /// Local use 0 (16).
    Local0,
    /// Local use 1 (17).
    Local1,
    /// Local use 2 (18).
    Local2,
    /// Local use 3 (19).
    Local3,
    /// Local use 4 (20).
    Local4,
    /// Local use 5 (21).
    Local5,
    /// Local use 6 (22).
    Local6,
    /// Local use 7 (23).
    Local7,
}

const FACILITIES: [Facility; 24] = [
    Facility::Kern,
    Facility::User,
    Facility::Mail,
    Facility::Daemon,
    Facility::Auth,
    Facility::Syslog,
    Facility::Lpr,
    Facility::News,
    Facility::Uucp,
    Facility::Cron,
    Facility::Authpriv,
    Facility::Ftp,
    Facility::Ntp,
    Facility::Logaudit,
    Facility::Logalert,
    Facility::Clockd,
    Facility::Local0,
    Facility::Local1,
    Facility::Local2,
    Facility::Local3,
    Facility::Local4,
    Facility::Local5,
    Facility::Local6,
    Facility::Local7,
];

impl Facility {
    /// Numeric RFC 5424 code (0-23).
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a facility by numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        FACILITIES.get(usize::from(code)).copied()
    }

    /// Upper-case configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Facility::Kern => "KERN",
            Facility::User => "USER",
            Facility::Mail => "MAIL",
            Facility::Daemon => "DAEMON",
            Facility::Auth => "AUTH",
            Facility::Syslog => "SYSLOG",
            Facility::Lpr => "LPR",
            Facility::News => "NEWS",
            Facility::Uucp => "UUCP",
            Facility::Cron => "CRON",
            Facility::Authpriv => "AUTHPRIV",
            Facility::Ftp => "FTP",
            Facility::Ntp => "NTP",
            Facility::Logaudit => "LOGAUDIT",
            Facility::Logalert => "LOGALERT",
            Facility::Clockd => "CLOCKD",
            Facility::Local0 => "LOCAL0",
            Facility::Local1 => "LOCAL1",
            Facility::Local2 => "LOCAL2",
            Facility::Local3 => "LOCAL3",
            Facility::Local4 => "LOCAL4",
            Facility::Local5 => "LOCAL5",
            Facility::Local6 => "LOCAL6",
            Facility::Local7 => "LOCAL7",
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FACILITIES
            .into_iter()
            .find(|facility| facility.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown syslog facility '{trimmed}'"))
    }
}
