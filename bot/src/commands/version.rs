use chrono::{TimeZone, Utc};

/// Build time as a UTC date when the build script stored epoch seconds
fn build_time(raw: &str) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn run() {
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let git_branch = option_env!("GIT_BRANCH").unwrap_or("unknown");
    let built = build_time(option_env!("BUILD_TIME").unwrap_or("unknown"));

    println!("quant-bot {}", env!("CARGO_PKG_VERSION"));
    println!("Branch: {}", git_branch);
    println!("Commit: {}", git_hash);
    println!("Build Time: {}", built);
    println!("OS: {}", std::env::consts::OS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_time_formatting() {
        assert_eq!(build_time("0"), "1970-01-01 00:00:00 UTC");
        assert_eq!(build_time("unknown"), "unknown");
    }
}
