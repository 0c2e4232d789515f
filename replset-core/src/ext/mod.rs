use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";
const DEBUG_DIRECTIVE: &str = "debug";

pub fn init_logger(level: tracing::Level) {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .pretty();
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_max_level(level)
        .init();
}

pub fn init_logger_with_filter(filter: impl Into<EnvFilter>) {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_file(false);
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .init();
}

/// Filter directives in order of precedence: `explicit`, then `RUST_LOG`, then a non-empty
/// `DEBUG` variable selecting `debug`, otherwise `info`.
pub fn env_filter(explicit: Option<&str>) -> Result<EnvFilter, ParseError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let debug = std::env::var("DEBUG").ok();
    EnvFilter::try_new(select_directives(explicit, rust_log.as_deref(), debug.as_deref()))
}

fn select_directives<'a>(explicit: Option<&'a str>, rust_log: Option<&'a str>, debug: Option<&str>) -> &'a str {
    let non_empty = |value: &&str| !value.trim().is_empty();
    if let Some(directives) = explicit.filter(non_empty).or(rust_log.filter(non_empty)) {
        return directives;
    }
    match debug {
        Some(flag) if !flag.is_empty() && flag != "0" && !flag.eq_ignore_ascii_case("false") => DEBUG_DIRECTIVE,
        _ => DEFAULT_DIRECTIVE,
    }
}
