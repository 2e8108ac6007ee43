//! Minimal client-agent classification. Tablet markers are checked
//! before mobile ones because tablet agent strings usually also contain
//! "Mobile"; everything inconclusive is desktop.

use events_models::DeviceClass;

pub fn classify_device(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_ascii_lowercase();

    if ua.contains("ipad")
        || ua.contains("tablet")
        || ua.contains("kindle")
        || (ua.contains("android") && !ua.contains("mobile"))
    {
        return DeviceClass::Tablet;
    }
    if ua.contains("mobile")
        || ua.contains("iphone")
        || ua.contains("android")
        || ua.contains("windows phone")
    {
        return DeviceClass::Mobile;
    }
    DeviceClass::Desktop
}

pub fn browser_name(user_agent: &str) -> Option<String> {
    let ua = user_agent.to_ascii_lowercase();

    // Order matters: Edge and Opera embed "chrome", Chrome and friends
    // embed "safari".
    let name = if ua.contains("edg/") || ua.contains("edge") {
        "Edge"
    }
    else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    }
    else if ua.contains("firefox") {
        "Firefox"
    }
    else if ua.contains("chrome") || ua.contains("crios") {
        "Chrome"
    }
    else if ua.contains("safari") {
        "Safari"
    }
    else {
        return None;
    };
    Some(name.to_string())
}

pub fn os_name(user_agent: &str) -> Option<String> {
    let ua = user_agent.to_ascii_lowercase();

    // iOS before macOS: iPhone agents claim "like Mac OS X".
    let name = if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    }
    else if ua.contains("android") {
        "Android"
    }
    else if ua.contains("windows") {
        "Windows"
    }
    else if ua.contains("mac os") || ua.contains("macintosh") {
        "macOS"
    }
    else if ua.contains("linux") {
        "Linux"
    }
    else {
        return None;
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like \
                          Mac OS X) AppleWebKit/605.1.15 (KHTML, like \
                          Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) \
                        AppleWebKit/605.1.15 (KHTML, like Gecko) \
                        Version/16.0 Mobile/15E148 Safari/604.1";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
                                 AppleWebKit/537.36 (KHTML, like Gecko) \
                                 Chrome/120.0 Mobile Safari/537.36";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; \
                                  SM-X710) AppleWebKit/537.36 (KHTML, \
                                  like Gecko) Chrome/120.0 Safari/537.36";
    const MAC_FIREFOX: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X \
                               14.0; rv:120.0) Gecko/20100101 \
                               Firefox/120.0";

    #[test]
    fn phones_classify_as_mobile() {
        assert_eq!(classify_device(IPHONE), DeviceClass::Mobile);
        assert_eq!(classify_device(ANDROID_PHONE), DeviceClass::Mobile);
    }

    #[test]
    fn tablets_classify_before_mobile() {
        // iPad agents contain "Mobile" and must still land on tablet.
        assert_eq!(classify_device(IPAD), DeviceClass::Tablet);
        assert_eq!(classify_device(ANDROID_TABLET), DeviceClass::Tablet);
    }

    #[test]
    fn inconclusive_agents_default_to_desktop() {
        assert_eq!(classify_device(MAC_FIREFOX), DeviceClass::Desktop);
        assert_eq!(classify_device("curl/8.4.0"), DeviceClass::Desktop);
        assert_eq!(classify_device(""), DeviceClass::Desktop);
    }

    #[test]
    fn browser_detection_orders_embedded_tokens() {
        assert_eq!(browser_name(ANDROID_PHONE).as_deref(), Some("Chrome"));
        assert_eq!(browser_name(MAC_FIREFOX).as_deref(), Some("Firefox"));
        assert_eq!(browser_name(IPHONE).as_deref(), Some("Safari"));
        assert_eq!(
            browser_name("Mozilla/5.0 ... Chrome/120.0 ... Edg/120.0")
                .as_deref(),
            Some("Edge")
        );
        assert_eq!(browser_name("curl/8.4.0"), None);
    }

    #[test]
    fn os_detection_puts_ios_before_macos() {
        assert_eq!(os_name(IPHONE).as_deref(), Some("iOS"));
        assert_eq!(os_name(MAC_FIREFOX).as_deref(), Some("macOS"));
        assert_eq!(os_name(ANDROID_PHONE).as_deref(), Some("Android"));
        assert_eq!(os_name("curl/8.4.0"), None);
    }
}
