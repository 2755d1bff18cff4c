//! Engine version detection from the main output.

/// Shown when the main output carries no recognizable version banner.
pub const UNKNOWN_VERSION: &str = "Unknown Version";

const BANNER_LINES: usize = 20;
const RELEASE_MARKERS: [&str; 3] = ["master", "gold", "c17"];

/// First banner line naming the engine and a release branch, trimmed.
pub fn engine_version(main_output: &str) -> Option<&str> {
    main_output
        .lines()
        .take(BANNER_LINES)
        .find(|line| {
            line.contains("Cloudy") && RELEASE_MARKERS.iter().any(|marker| line.contains(marker))
        })
        .map(str::trim)
}
