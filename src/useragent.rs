//! Best-effort parsing of browser user-agent strings for the hierarchical
//! schema. Unrecognized input yields absent fields, never an error.

/// Parsed user-agent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub device: Option<String>,
}

// Product tokens checked in priority order: Chromium-family browsers embed
// `Chrome/` and `Safari/`, so the more specific tokens must win.
const BROWSERS: [(&str, &str); 5] = [
    ("Edg", "Edge"),
    ("OPR", "Opera"),
    ("Firefox", "Firefox"),
    ("Chrome", "Chrome"),
    ("Safari", "Safari"),
];

const DEVICES: [&str; 3] = ["iPhone", "iPad", "Android"];

/// Parse a raw `User-Agent` header value.
pub fn parse(original: &str) -> UserAgentInfo {
    let mut info = UserAgentInfo::default();

    for (token, name) in BROWSERS {
        if let Some(version) = version_after(original, token) {
            info.name = Some(name.to_string());
            // Safari reports its real version in a separate `Version/` token.
            if name == "Safari" {
                info.version = version_after(original, "Version").or(Some(version));
            } else {
                info.version = Some(version);
            }
            break;
        }
    }

    info.device = DEVICES
        .iter()
        .find(|device| original.contains(**device))
        .map(|device| (*device).to_string());

    info
}

/// Version string following `{token}/`, up to the next whitespace.
fn version_after(input: &str, token: &str) -> Option<String> {
    let marker = format!("{token}/");
    let start = input.find(&marker)? + marker.len();
    let rest = &input[start..];
    let version: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ';' && *c != ')')
        .collect();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}
