//! Call-site identity
//!
//! Every ad request is attributed to a *caller key*: a stable token naming
//! the source call site. The same call site must always map to the same
//! key, because placement indices (and therefore blocklist decisions and
//! analytics) are assigned per caller key.
//!
//! Two resolution paths exist:
//!
//! - [`current_call_site`]: the native path. `#[track_caller]` makes the
//!   compiler hand us the user's call expression as `file:line:column`.
//!   Public id-generating entry points are themselves `#[track_caller]` so
//!   the token propagates through the crate to the real caller.
//! - [`caller_key_from_frames`]: the compatibility path for host runtimes
//!   that deliver raw stack-trace text (e.g. an embedded JS runtime calling
//!   in over FFI). Frames are walked outward past library-internal and
//!   infrastructure frames, and the first surviving frame is parsed for a
//!   `file:line:col` token.
//!
//! Identity resolution gates revenue-affecting requests, so it never
//! panics: anything unparseable degrades to [`UNKNOWN_CALLER`].

use std::panic::Location;

/// Sentinel caller key used when no call site can be determined.
pub const UNKNOWN_CALLER: &str = "unknown_caller";

/// Frame substrings identifying this library's own shims in a host
/// runtime's trace. Frames matching any of these are never the caller.
const INTERNAL_FRAME_MARKERS: &[&str] = &[
    "adgate",
    "PlacementRegistry",
    "AdLifecycle",
    "showInterstitial",
    "showRewarded",
    "BannerAd",
    "AppOpenAd",
];

/// Frame substrings identifying runtime infrastructure: async shims,
/// native/bridge frames, promise trampolines and framework render
/// internals. None of these name a user call site.
const INFRA_FRAME_MARKERS: &[&str] = &[
    "<anonymous>",
    "[native code]",
    "(native)",
    "tryCallOne",
    "tryCallTwo",
    "_callTimer",
    "processTicksAndRejections",
    "asyncGeneratorStep",
    "_asyncToGenerator",
    "renderWithHooks",
    "commitHookEffectList",
];

/// Capture the caller's source location as a `file:line:column` token.
///
/// Annotate any public function that forwards here with `#[track_caller]`
/// so the token names the application's call expression, not a frame
/// inside this crate.
#[track_caller]
pub fn current_call_site() -> String {
    let loc = Location::caller();
    format!("{}:{}:{}", loc.file(), loc.line(), loc.column())
}

/// Derive a caller key from raw stack-trace frames, innermost first.
///
/// An explicit `tag` wins unconditionally and bypasses frame inspection.
/// Otherwise the first frame that is neither library-internal nor runtime
/// infrastructure is parsed for a `file:line:col` token; a frame that
/// carries no parseable location contributes its trimmed text instead.
/// If no frame survives, [`UNKNOWN_CALLER`] is returned.
pub fn caller_key_from_frames<'a, I>(frames: I, tag: Option<&str>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(tag) = tag {
        return tag.to_string();
    }

    for frame in frames {
        let trimmed = frame.trim();
        if trimmed.is_empty() || trimmed == "Error" {
            continue;
        }
        if is_internal_frame(trimmed) || is_infra_frame(trimmed) {
            continue;
        }
        if let Some(location) = parse_frame_location(trimmed) {
            return location.to_string();
        }
        // No location token in this frame; the raw text still names the
        // call site stably within one build.
        return trimmed.to_string();
    }

    UNKNOWN_CALLER.to_string()
}

fn is_internal_frame(frame: &str) -> bool {
    INTERNAL_FRAME_MARKERS.iter().any(|m| frame.contains(m))
}

fn is_infra_frame(frame: &str) -> bool {
    INFRA_FRAME_MARKERS.iter().any(|m| frame.contains(m))
}

/// Extract a `file:line:col` token from a single trace frame.
///
/// Two layouts are accepted:
///
/// - `at name (file:line:col)` / `at file:line:col` (V8-style)
/// - `name@file:line:col` (JSC/Hermes-style)
fn parse_frame_location(frame: &str) -> Option<&str> {
    // JSC layout: everything after the last `@`.
    if let Some(idx) = frame.rfind('@') {
        let candidate = &frame[idx + 1..];
        if is_location_token(candidate) {
            return Some(candidate);
        }
    }

    let rest = frame.strip_prefix("at ").unwrap_or(frame);

    // V8 layout with a function name: location sits in the final parens.
    if let Some(open) = rest.rfind('(') {
        let inner = rest[open + 1..].trim_end_matches(')');
        if is_location_token(inner) {
            return Some(inner);
        }
    }

    // Bare `at file:line:col`.
    if is_location_token(rest) {
        return Some(rest);
    }

    None
}

/// Does `s` look like `file:line:col` with a non-empty file part?
fn is_location_token(s: &str) -> bool {
    let Some((rest, col)) = s.rsplit_once(':') else {
        return false;
    };
    let Some((file, line)) = rest.rsplit_once(':') else {
        return false;
    };
    !file.is_empty() && is_digits(line) && is_digits(col)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
