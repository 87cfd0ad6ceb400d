use mirror_core::{build_targets, parse_target_list, TargetError};
use pretty_assertions::assert_eq;
use url::Url;

fn base() -> Url {
    Url::parse("https://example.test/").unwrap()
}

#[test]
fn list_ignores_comments_and_blank_lines() {
    let raw = "// assets\n/about\n\n   \n  style.css  \r\n// /skipped\n/img/a.png\n";
    assert_eq!(
        parse_target_list(raw),
        vec!["/about", "style.css", "/img/a.png"]
    );
}

#[test]
fn targets_are_absolute_decoded_and_deduplicated() {
    let set = build_targets(
        &base(),
        ["/about", "about", "/a%20b.pdf", "/a b.pdf", "/about"],
    );
    let urls: Vec<_> = set.targets.iter().map(|t| t.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://example.test/about", "https://example.test/a b.pdf"]
    );
    assert_eq!(set.duplicates, 3);
    assert!(set.rejected.is_empty());
}

#[test]
fn relative_paths_resolve_against_base_directory() {
    let base = Url::parse("https://example.test/site/").unwrap();
    let set = build_targets(&base, ["page", "/root.css", "../up.js"]);
    let urls: Vec<_> = set.targets.into_iter().map(|t| t.into_string()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.test/site/page",
            "https://example.test/root.css",
            "https://example.test/up.js",
        ]
    );
}

#[test]
fn decoded_target_reparses_for_requests() {
    let set = build_targets(&base(), ["/a%20b.pdf"]);
    let url = set.targets[0].to_url().unwrap();
    assert_eq!(url.path(), "/a%20b.pdf");
}

#[test]
fn unjoinable_paths_are_rejected() {
    let set = build_targets(&base(), ["http://[::1"]);
    assert!(set.targets.is_empty());
    assert!(matches!(set.rejected[0], TargetError::Join { .. }));
}
