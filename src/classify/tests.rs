use std::collections::HashSet;

use super::{Classifier, Decision};

fn no_registry() -> HashSet<String> {
    HashSet::new()
}

fn registry(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn renderer_helper_collapses_to_parent() {
    let classifier = Classifier::default();
    assert_eq!(
        classifier.classify("Safari Helper (Renderer)", &no_registry()),
        Decision::Included("Safari".to_string())
    );
    assert_eq!(
        classifier.classify("Google Chrome Helper (GPU)", &registry(&["Google Chrome"])),
        Decision::Included("Google Chrome".to_string())
    );
}

#[test]
fn apple_namespace_is_excluded() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify("com.apple.WebKit.WebContent", &no_registry()), Decision::Excluded);
    assert_eq!(classifier.classify("com.apple.Safari.SafeBrowsing", &no_registry()), Decision::Excluded);
}

#[test]
fn known_daemons_are_excluded() {
    let classifier = Classifier::default();
    for name in ["launchd", "kernel_task", "WindowServer", "mds_stores", "fseventsd"] {
        assert_eq!(classifier.classify(name, &no_registry()), Decision::Excluded, "{name}");
    }
}

#[test]
fn own_process_is_excluded() {
    let classifier = Classifier::new("drainwatch");
    assert_eq!(classifier.classify("drainwatch", &no_registry()), Decision::Excluded);
}

#[test]
fn unknown_capitalised_name_passes_heuristic() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify("Balatro", &no_registry()), Decision::Included("Balatro".to_string()));
}

#[test]
fn path_prefix_is_stripped() {
    let classifier = Classifier::default();
    assert_eq!(
        classifier.classify("/Applications/Balatro.app/Contents/MacOS/Balatro", &no_registry()),
        Decision::Included("Balatro".to_string())
    );
}

#[test]
fn noise_suffix_excludes_unless_whitelisted() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify("SoftwareUpdateAgent", &no_registry()), Decision::Excluded);
    assert_eq!(classifier.classify("installerdaemon", &no_registry()), Decision::Excluded);
    // "Finder" is whitelisted; a hypothetical suffix collision must not hide it.
    assert_eq!(classifier.classify("Finder", &no_registry()), Decision::Included("Finder".to_string()));
}

#[test]
fn bundle_identifier_takes_last_component() {
    let classifier = Classifier::default();
    assert_eq!(
        classifier.classify("com.tencent.WeChat", &registry(&["WeChat"])),
        Decision::Included("WeChat".to_string())
    );
}

#[test]
fn collapsing_can_reveal_a_system_name() {
    let classifier = Classifier::default();
    // "(Renderer)" is not a noise suffix, but the name collapses to
    // "trustd", which is on the hard exclude list.
    assert_eq!(classifier.classify("trustd (Renderer)", &no_registry()), Decision::Excluded);
}

#[test]
fn lowercase_unknown_name_fails_heuristic() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify("node", &no_registry()), Decision::Excluded);
    // A registry match lets the same shape through.
    assert_eq!(
        classifier.classify("zoom.us", &registry(&["zoom.us"])),
        Decision::Included("zoom.us".to_string())
    );
}

#[test]
fn known_game_bypasses_heuristic() {
    let classifier = Classifier::default();
    // "java" is lowercase and would fail the heuristic.
    assert_eq!(classifier.classify("java", &no_registry()), Decision::Included("java".to_string()));
}

#[test]
fn excluded_name_check_covers_collapsed_form() {
    let classifier = Classifier::default();
    assert!(classifier.is_excluded_name("com.apple.WebKit.WebContent"));
    assert!(classifier.is_excluded_name("trustd (Renderer)"));
    assert!(!classifier.is_excluded_name("Safari"));
}
