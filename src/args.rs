use std::ops::RangeInclusive;

/// Value of `--name=value` or `--name value`.
pub fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

/// First argument that is not a flag or a flag's value.
pub fn positional(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !arg.contains('=');
            continue;
        }
        return Some(arg.as_str());
    }
    None
}

/// `2021`, `2019-2021` or `2019..2021`, always returned low to high.
pub fn parse_season_range(raw: &str) -> Option<RangeInclusive<i32>> {
    let raw = raw.trim();
    let (a, b) = raw
        .split_once("..")
        .or_else(|| raw.split_once('-'))
        .unwrap_or((raw, raw));
    let a = a.trim().parse::<i32>().ok()?;
    let b = b.trim().trim_start_matches('=').parse::<i32>().ok()?;
    Some(a.min(b)..=a.max(b))
}
