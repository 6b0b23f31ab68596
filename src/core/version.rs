use std::cmp::Ordering;
use std::fmt;

/// Resolved package version.
///
/// NuGet versions are usually semver, but legacy 4-part versions
/// (`4.0.4.1`) and loose forms (`1.0`) occur in real lock files, so the
/// raw string is kept alongside an optional parsed semver plus the
/// dotted numeric release segments used as a comparison fallback.
#[derive(Debug, Clone)]
pub struct Version {
    pub raw: String,
    pub semver: Option<semver::Version>,
    release: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let semver = semver::Version::parse(&raw).ok();
        let (release, pre) = split_release(&raw);
        Self {
            raw,
            semver,
            release,
            pre,
        }
    }
}

fn split_release(raw: &str) -> (Vec<u64>, Option<String>) {
    let no_build = raw.split('+').next().unwrap_or(raw);
    let (release_part, pre) = match no_build.split_once('-') {
        Some((release, pre)) => (release, Some(pre.to_string())),
        None => (no_build, None),
    };
    let release = release_part
        .split('.')
        .map(|segment| segment.parse::<u64>().unwrap_or(0))
        .collect();
    (release, pre)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(lhs), Some(rhs)) = (self.semver.as_ref(), other.semver.as_ref()) {
            return lhs.cmp(rhs);
        }

        let len = self.release.len().max(other.release.len());
        for idx in 0..len {
            let lhs = self.release.get(idx).copied().unwrap_or(0);
            let rhs = other.release.get(idx).copied().unwrap_or(0);
            match lhs.cmp(&rhs) {
                Ordering::Equal => {}
                ordering => return ordering,
            }
        }

        // A release always sorts above any of its prereleases.
        match (self.pre.as_ref(), other.pre.as_ref()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(lhs), Some(rhs)) => lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase()),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone)]
struct Bound {
    version: Version,
    inclusive: bool,
}

/// NuGet version range.
///
/// Supported grammar: bare minimum (`1.0` means `>= 1.0`), intervals
/// with inclusive/exclusive ends (`[1.0, 2.0)`, `(, 2.0]`), exact pins
/// (`[1.0]`) and the unbounded `*`. Unparseable input degrades to the
/// unbounded range since ranges are advisory edge labels here.
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub raw: String,
    min: Option<Bound>,
    max: Option<Bound>,
}

impl VersionRange {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (min, max) = parse_bounds(raw.trim());
        Self { raw, min, max }
    }

    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            min: None,
            max: None,
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        if let Some(min) = self.min.as_ref() {
            let ordering = version.cmp(&min.version);
            if ordering == Ordering::Less || (ordering == Ordering::Equal && !min.inclusive) {
                return false;
            }
        }
        if let Some(max) = self.max.as_ref() {
            let ordering = version.cmp(&max.version);
            if ordering == Ordering::Greater || (ordering == Ordering::Equal && !max.inclusive) {
                return false;
            }
        }
        true
    }
}

fn parse_bounds(raw: &str) -> (Option<Bound>, Option<Bound>) {
    if raw.is_empty() || raw == "*" {
        return (None, None);
    }

    let starts_interval = raw.starts_with('[') || raw.starts_with('(');
    let ends_interval = raw.ends_with(']') || raw.ends_with(')');
    if !starts_interval && !ends_interval {
        // Bare version: inclusive minimum, no maximum.
        return (
            Some(Bound {
                version: Version::parse(raw),
                inclusive: true,
            }),
            None,
        );
    }
    if !(starts_interval && ends_interval) {
        return (None, None);
    }

    let min_inclusive = raw.starts_with('[');
    let max_inclusive = raw.ends_with(']');
    let inner = &raw[1..raw.len() - 1];

    match inner.split_once(',') {
        None => {
            // Exact pin, e.g. [1.2.3]
            let version = inner.trim();
            if version.is_empty() {
                return (None, None);
            }
            let min = Bound {
                version: Version::parse(version),
                inclusive: min_inclusive,
            };
            let max = Bound {
                version: Version::parse(version),
                inclusive: max_inclusive,
            };
            (Some(min), Some(max))
        }
        Some((low, high)) => {
            let low = low.trim();
            let high = high.trim();
            let min = (!low.is_empty()).then(|| Bound {
                version: Version::parse(low),
                inclusive: min_inclusive,
            });
            let max = (!high.is_empty()).then(|| Bound {
                version: Version::parse(high),
                inclusive: max_inclusive,
            });
            (min, max)
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
