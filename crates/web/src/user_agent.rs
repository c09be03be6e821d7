//! Coarse user-agent classification for the visit log. Substring rules
//! only; anything unrecognized stays `None`.

pub struct UserAgentInfo {
    pub device_type: String,
    pub browser: Option<String>,
    pub os: Option<String>,
}

pub fn classify(user_agent: &str) -> UserAgentInfo {
    let ua = user_agent.to_lowercase();
    UserAgentInfo {
        device_type: device_type(&ua).to_owned(),
        browser: browser(&ua).map(str::to_owned),
        os: operating_system(&ua).map(str::to_owned),
    }
}

fn device_type(ua: &str) -> &'static str {
    const MOBILE: &[&str] =
        &["iphone", "android", "blackberry", "webos", "windows phone"];
    const TABLET: &[&str] = &["ipad", "tablet", "kindle"];

    if MOBILE.iter().any(|agent| ua.contains(agent))
        && !ua.contains("ipad")
        && !ua.contains("tablet")
    {
        "mobile"
    } else if TABLET.iter().any(|agent| ua.contains(agent)) {
        "tablet"
    } else {
        "desktop"
    }
}

fn browser(ua: &str) -> Option<&'static str> {
    if ua.contains("edge") || ua.contains("edg/") {
        Some("Edge")
    } else if ua.contains("chrome") && !ua.contains("chromium") {
        Some("Chrome")
    } else if ua.contains("safari") && !ua.contains("chrome") {
        Some("Safari")
    } else if ua.contains("firefox") {
        Some("Firefox")
    } else if ua.contains("msie") || ua.contains("trident/") {
        Some("Internet Explorer")
    } else if ua.contains("opera") || ua.contains("opr/") {
        Some("Opera")
    } else {
        None
    }
}

fn operating_system(ua: &str) -> Option<&'static str> {
    // Mobile systems first: an iPhone agent also claims "like Mac OS X".
    if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        Some("iOS")
    } else if ua.contains("android") {
        Some("Android")
    } else if ua.contains("windows") {
        Some("Windows")
    } else if ua.contains("macintosh") || ua.contains("mac os x") {
        Some("macOS")
    } else if ua.contains("linux") {
        Some("Linux")
    } else {
        None
    }
}
