//! Static classification rule tables.
//!
//! These are data, not code: the classifier walks them with one generic
//! matcher so the tables can later move to a config file without touching
//! the algorithm. Ordering matters only for [`HELPER_PATTERNS`], which is
//! most-specific-first so `" Helper (Renderer)"` wins over `" Helper"`.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// A single name-matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    Exact(&'static str),
    Prefix(&'static str),
    Suffix(&'static str),
}

impl Rule {
    pub(crate) fn matches(&self, name: &str) -> bool {
        match self {
            Rule::Exact(s) => name == *s,
            Rule::Prefix(s) => name.starts_with(s),
            Rule::Suffix(s) => name.ends_with(s),
        }
    }
}

/// Known OS daemons, services, and helpers that are never user-meaningful,
/// matched by literal name.
pub(crate) static HARD_EXCLUDE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "kernel_task",
        "launchd",
        "WindowServer",
        "loginwindow",
        "SystemUIServer",
        "Dock",
        "Spotlight",
        "mds",
        "mds_stores",
        "mdworker",
        "mdworker_shared",
        "cfprefsd",
        "distnoted",
        "trustd",
        "secinitd",
        "securityd",
        "coreservicesd",
        "bluetoothd",
        "airportd",
        "wifid",
        "locationd",
        "nsurlsessiond",
        "networkserviceproxy",
        "powerd",
        "thermald",
        "syslogd",
        "logd",
        "configd",
        "notifyd",
        "usernoted",
        "WindowManager",
        "ControlCenter",
        "NotificationCenter",
        "AXVisualSupportAgent",
        "coreaudiod",
        "audioclocksyncd",
        "corespeechd",
        "AppleSpell",
        "backupd",
        "cloudd",
        "bird",
        "netbiosd",
        "CalendarAgent",
        "AddressBookSource",
        "VTEncoderXPCService",
        "com.apple.WebKit.GPU",
        "com.apple.WebKit.WebContent",
        "com.apple.WebKit.Networking",
        "com.apple.DriverKit-AppleUserHIDDrivers",
        "com.apple.Safari.SafeBrowsing",
        "SafariCloudHistoryPushAgent",
        "smd",
        "containermanagerd",
        "runningboardd",
        "CommCenter",
        "UserEventAgent",
        "sharingd",
        "rapportd",
        "IMDPersistenceAgent",
        "identityservicesd",
        "imagent",
        "akd",
        "amsaccountsd",
        "amsengagementd",
        "callservicesd",
        "deleted",
        "diagnosticd",
        "diskarbitrationd",
        "diskmanagementd",
        "fileproviderd",
        "fseventsd",
        "hidd",
        "iconservicesagent",
        "lsd",
        "mediaanalysisd",
        "opendirectoryd",
        "pbs",
        "sandboxd",
        "secd",
        "symptomsd",
        "sysextd",
        "syspolicyd",
        "timed",
        "trustdFileHelper",
        "universalaccessd",
        "usermanagerd",
        "warmd",
        "xpcproxy",
        "duetexpertd",
        "siriknowledged",
        "parsecd",
        "suggestd",
        "coreduetd",
        "intelligenceplatformd",
        "knowledgeconstructiond",
        "contextstored",
        "proactiveeventtrackerd",
        "peopled",
        "photoanalysisd",
        "ReportCrash",
        "storeaccountd",
        "bookassetd",
        "fud",
        "gamecontrollerd",
        "avconferenced",
        "WiFiAgent",
        "WirelessRadioManagerd",
        "ctkd",
        "pkd",
        "AMPDevicesAgent",
        "AMPLibraryAgent",
        "AMPArtworkAgent",
        "AMPDeviceDiscoveryAgent",
        "CVMServer",
        "gpuinfo",
        "MTLCompilerService",
        "apsd",
        "dasd",
        "tccd",
        "watchdogd",
        "revisiond",
        "spindump",
        "sysmond",
        "systemstats",
        "talagent",
        "ps",
        "top",
    ])
});

/// System-namespace prefixes excluded outright.
pub(crate) static SYSTEM_PREFIX_RULES: &[Rule] = &[Rule::Prefix("com.apple.")];

/// Suffixes that mark background noise (daemons, helpers, extensions).
/// The interactive whitelist takes precedence over these.
pub(crate) static NOISE_RULES: &[Rule] = &[
    Rule::Suffix("XPCServices"),
    Rule::Suffix("XPCService"),
    Rule::Suffix("LoginItem"),
    Rule::Suffix("Extension"),
    Rule::Suffix("extension"),
    Rule::Suffix("Service"),
    Rule::Suffix("service"),
    Rule::Suffix("Daemon"),
    Rule::Suffix("daemon"),
    Rule::Suffix("Helper"),
    Rule::Suffix("helper"),
    Rule::Suffix("Agent"),
    Rule::Suffix("agent"),
    Rule::Suffix("Plugin"),
    Rule::Suffix("plugin"),
    Rule::Suffix("Wrapper"),
    Rule::Suffix("wrapper"),
    Rule::Suffix("Runner"),
    Rule::Suffix("runner"),
    Rule::Suffix("Manager"),
    Rule::Suffix("manager"),
    Rule::Suffix("XPC"),
    Rule::Suffix("xpc"),
    Rule::Suffix("d_sim"),
    Rule::Suffix("Worker"),
];

/// Interactive applications that must never be filtered, even when their
/// names collide with a noise suffix (e.g. a name ending in "Manager").
pub(crate) static INTERACTIVE_WHITELIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "Safari",
        "Xcode",
        "Finder",
        "Terminal",
        "iTerm",
        "iTerm2",
        "Visual Studio Code",
        "Cursor",
        "Chrome",
        "Google Chrome",
        "Firefox",
        "Arc",
        "Brave Browser",
        "Music",
        "Mail",
        "Notes",
        "Preview",
        "System Settings",
        "System Preferences",
        "Activity Monitor",
        "WeChat",
        "QQ",
        "DingTalk",
        "Slack",
        "Discord",
        "Telegram",
        "Spotify",
        "zoom.us",
    ])
});

/// Games whose names fail the user-app heuristic or live outside the app
/// registry (fullscreen titles often do).
pub(crate) static KNOWN_GAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "Balatro",
        "Factorio",
        "Terraria",
        "Stardew Valley",
        "Hades",
        "Celeste",
        "dota2",
        "cs2",
        "java", // Minecraft runs under the bare JVM name
    ])
});

/// Helper/child process suffixes collapsed to the parent application name,
/// most specific first.
pub(crate) static HELPER_PATTERNS: &[&str] = &[
    " Helper (Renderer)",
    " Helper (GPU)",
    " Helper (Plugin)",
    " Helper",
    " Renderer",
    " GPU Process",
    " Plugin",
    " Networking",
    " Web Content",
    " Extension",
    "-Helper",
    "-Renderer",
    "-GPU",
    ".Helper",
    ".Renderer",
    ".GPU",
    " (Renderer)",
    " (GPU)",
    " (Plugin)",
];

/// Reverse-DNS bundle prefixes whose last dot-delimited component is the
/// display name.
pub(crate) static BUNDLE_PREFIXES: &[&str] = &["com.", "cn.", "io."];
