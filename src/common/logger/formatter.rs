use core::fmt as core_fmt;

use time::{OffsetDateTime, macros::format_description};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";

/// `[timestamp] LEVEL target:line > message`, optionally coloured.
pub struct RoomFormatter {
    ansi: bool,
}

impl RoomFormatter {
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }

    fn level_colour(level: &Level) -> &'static str {
        match *level {
            Level::ERROR => "\x1b[31m",
            Level::WARN => "\x1b[33m",
            Level::INFO => "\x1b[32m",
            Level::DEBUG => "\x1b[34m",
            Level::TRACE => "\x1b[35m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for RoomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let format = format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        );
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(&format)
            .unwrap_or_else(|_| "????-??-?? ??:??:??.???".to_string());

        let metadata = event.metadata();
        let level = metadata.level();
        let line = metadata.line().unwrap_or(0);

        if self.ansi {
            write!(
                writer,
                "{DIM}[{stamp}]{RESET} {}{BOLD}{:<5}{RESET} {DIM}{}:{}{RESET} > ",
                Self::level_colour(level),
                level.as_str(),
                metadata.target(),
                line,
            )?;
        } else {
            write!(
                writer,
                "[{stamp}] {:<5} {}:{} > ",
                level.as_str(),
                metadata.target(),
                line,
            )?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        if self.ansi {
            write!(writer, "{RESET}")?;
        }
        writeln!(writer)
    }
}
