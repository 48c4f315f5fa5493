//! Terminal styling for `dfp` output
//!
//! Everything printed by the CLI goes through a [`Tone`]. Record statuses
//! and alert kinds map onto tones, so a rejected file and a failed upload
//! read the same way on screen. Color detection is left to `owo-colors`,
//! which honors `NO_COLOR`, `CLICOLOR` and `CLICOLOR_FORCE`.
//!
//! | Tone       | Look   | Stream | Used for                          |
//! |------------|--------|--------|-----------------------------------|
//! | `Accent`   | Cyan   | stdout | record ids, file names            |
//! | `Good`     | Green  | stdout | accepted records, success banners |
//! | `Bad`      | Red    | stderr | rejected records, failed uploads  |
//! | `Caution`  | Yellow | stderr | advisories, accepted with errors  |
//! | `Quiet`    | Dim    | stdout | pending records, hints            |
//! | `Heading`  | Bold   | stdout | bucket names, section labels      |

use datafile_portal::submit::{Alert, AlertKind};
use datafile_portal::types::Status;
use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream, Style};
use std::fmt::{self, Display};
use std::sync::OnceLock;

/// Semantic color of a piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Identifiers worth spotting at a glance
    Accent,
    /// Something finished well
    Good,
    /// Something failed
    Bad,
    /// Needs attention but nothing failed
    Caution,
    /// Secondary detail
    Quiet,
    /// Headers
    Heading,
}

impl Tone {
    const fn style(self) -> Style {
        match self {
            Self::Accent => Style::new().cyan(),
            Self::Good => Style::new().green(),
            Self::Bad => Style::new().red(),
            Self::Caution => Style::new().yellow(),
            Self::Quiet => Style::new().dimmed(),
            Self::Heading => Style::new().bold(),
        }
    }

    /// Problems are reported on stderr
    const fn stream(self) -> Stream {
        match self {
            Self::Bad | Self::Caution => Stream::Stderr,
            _ => Stream::Stdout,
        }
    }

    /// Tone a record status is shown in
    pub const fn of_status(status: Status) -> Self {
        match status {
            Status::Accepted => Self::Good,
            Status::Rejected => Self::Bad,
            Status::AcceptedWithErrors
            | Status::PartiallyAcceptedWithErrors
            | Status::TimedOut => Self::Caution,
            Status::Pending => Self::Quiet,
        }
    }

    const fn of_alert(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Success => Self::Good,
            AlertKind::Error => Self::Bad,
            AlertKind::Advisory => Self::Caution,
        }
    }
}

/// A value rendered in a [`Tone`]
#[derive(Clone, Debug)]
pub struct Styled<T> {
    value: T,
    tone: Tone,
    stream: Stream,
}

impl<T> Styled<T> {
    const fn new(value: T, tone: Tone) -> Self {
        Self {
            value,
            tone,
            stream: tone.stream(),
        }
    }

    /// Detect color support against stderr instead
    #[must_use]
    pub const fn for_stderr(mut self) -> Self {
        self.stream = Stream::Stderr;
        self
    }

    /// Detect color support against stdout instead
    #[must_use]
    pub const fn for_stdout(mut self) -> Self {
        self.stream = Stream::Stdout;
        self
    }
}

impl<T: Display> Display for Styled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = self.tone.style();
        write!(
            f,
            "{}",
            self.value.if_supports_color(self.stream, |v| v.style(style))
        )
    }
}

/// Shorthand for putting any displayable value in a tone
pub trait Stylize: Display {
    /// Render in `tone`
    fn tone(&self, tone: Tone) -> Styled<&Self> {
        Styled::new(self, tone)
    }

    /// [`Tone::Accent`]
    fn accent(&self) -> Styled<&Self> {
        self.tone(Tone::Accent)
    }

    /// [`Tone::Good`]
    fn success(&self) -> Styled<&Self> {
        self.tone(Tone::Good)
    }

    /// [`Tone::Bad`]
    fn error(&self) -> Styled<&Self> {
        self.tone(Tone::Bad)
    }

    /// [`Tone::Caution`]
    fn warn(&self) -> Styled<&Self> {
        self.tone(Tone::Caution)
    }

    /// [`Tone::Quiet`]
    fn muted(&self) -> Styled<&Self> {
        self.tone(Tone::Quiet)
    }

    /// [`Tone::Heading`]
    fn emphasis(&self) -> Styled<&Self> {
        self.tone(Tone::Heading)
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Marker for created records and successful submissions
pub const CHECK: &str = "✓";

/// Marker for failed uploads and status checks
pub const CROSS: &str = "✗";

/// Marker for advisories
pub const INFO: &str = "!";

/// Green check
pub const fn check() -> Styled<&'static str> {
    Styled::new(CHECK, Tone::Good)
}

/// Red cross, detected against stderr
pub const fn cross() -> Styled<&'static str> {
    Styled::new(CROSS, Tone::Bad)
}

/// Status label in its tone, for stdout tables
pub fn status(status: Status) -> Styled<String> {
    Styled::new(status.to_string(), Tone::of_status(status)).for_stdout()
}

/// Print the submission banner
pub fn print_alert(alert: &Alert) {
    let tone = Tone::of_alert(alert.kind);
    let marker = match alert.kind {
        AlertKind::Success => CHECK,
        AlertKind::Error => CROSS,
        AlertKind::Advisory => INFO,
    };
    let line = format!("{} {}", marker.tone(tone), alert.message.tone(tone));
    match tone.stream() {
        Stream::Stdout => anstream::println!("{line}"),
        _ => anstream::eprintln!("{line}"),
    }
}

/// Spinner shown while waiting on record statuses
pub fn spinner_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .expect("hardcoded spinner template is valid")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        })
        .clone()
}
