use samplegen::config::resolve::ResolveError;
use samplegen::config::value::Origin;
use samplegen::config::{resolve, Config, RawStanza, SearchPaths};
use samplegen::sample::Sample;
use std::fs;
use tempfile::TempDir;

/// Config rooted at a temp dir whose `samples/` holds the given files
fn setup(files: &[&str]) -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let samples = dir.path().join("samples");
    fs::create_dir(&samples).unwrap();
    for name in files {
        fs::write(samples.join(name), "line one\nline two\n").unwrap();
    }
    let config = Config::new(SearchPaths::new(dir.path(), dir.path()));
    (dir, config)
}

fn stanza(name: &str) -> RawStanza {
    RawStanza::new(name).with("eai:acl", "test_app")
}

fn only<'a>(samples: &'a [Sample], name: &str) -> &'a Sample {
    let found: Vec<_> = samples.iter().filter(|s| s.name == name).collect();
    assert_eq!(found.len(), 1, "expected one sample named {name}");
    found[0]
}

#[test]
fn test_wildcard_fills_unset_setting_of_exact_stanza() {
    let (_dir, mut config) = setup(&["AExact"]);
    let stanzas = vec![stanza("A*").with("count", "10"), stanza("AExact")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.orig_name, "AExact");
    assert_eq!(sample.settings.int("count"), Some(10));
    assert_eq!(sample.settings.origin("count"), Some(Origin::Inherited));
}

#[test]
fn test_explicit_setting_beats_wildcard_in_any_order() {
    for exact_first in [true, false] {
        let (_dir, mut config) = setup(&["AExact"]);
        let wildcard = stanza("A*").with("count", "10");
        let exact = stanza("AExact").with("count", "3");
        let stanzas = if exact_first {
            vec![exact, wildcard]
        } else {
            vec![wildcard, exact]
        };

        let samples = resolve(&mut config, &stanzas).unwrap();

        assert_eq!(samples[0].settings.int("count"), Some(3));
    }
}

#[test]
fn test_value_equal_to_default_still_counts_as_set() {
    let (_dir, mut config) = setup(&["AExact"]);
    // 60 is also the built-in interval
    let stanzas = vec![
        stanza("A.*").with("interval", "5"),
        stanza("AExact").with("interval", "60"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].settings.int("interval"), Some(60));
}

#[test]
fn test_tokens_merge_winner_first() {
    let (_dir, mut config) = setup(&["AExact"]);
    let stanzas = vec![
        stanza("A.*")
            .with("token.0.token", "inherited")
            .with("token.0.replacementType", "static")
            .with("token.0.replacement", "x"),
        stanza("AExact")
            .with("token.0.token", "own-0")
            .with("token.0.replacementType", "static")
            .with("token.0.replacement", "y")
            .with("token.1.token", "own-1")
            .with("token.1.replacementType", "static")
            .with("token.1.replacement", "z"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    let patterns: Vec<_> = samples[0].tokens.iter().map(|t| t.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["own-0", "own-1", "inherited"]);
}

#[test]
fn test_later_override_source_is_applied_first() {
    let (_dir, mut config) = setup(&["AExact"]);
    let stanzas = vec![
        stanza("AExact"),
        stanza("A.*").with("count", "1"),
        stanza("AE.*").with("count", "2"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].settings.int("count"), Some(2));
}

#[test]
fn test_longer_pattern_wins_and_ties_go_to_earlier_stanza() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![
        stanza("web.*").with("interval", "5"),
        stanza("w.b.*").with("interval", "7").with("count", "3"),
        stanza("w.*").with("earliest", "-1h"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.orig_name, "web.*");
    assert_eq!(sample.settings.int("interval"), Some(5));
    assert_eq!(sample.settings.int("count"), Some(3));
    assert_eq!(sample.settings.text("earliest"), Some("-1h"));
}

#[test]
fn test_incomplete_token_is_pruned() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("web.log")
        .with("token.0.token", r"\d+")
        .with("token.0.replacementType", "random")
        .with("token.0.replacement", "integer[1:10]")
        .with("token.1.token", "user=(\\w+)")
        .with("token.1.replacementType", "static")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].tokens.len(), 1);
    assert_eq!(samples[0].tokens[0].pattern, r"\d+");
}

#[test]
fn test_wildcard_clones_one_sample_per_file() {
    let (dir, mut config) = setup(&["web-1.log", "web-2.log", "db.log"]);
    let stanzas = vec![stanza(r"web-\d\.log")
        .with("token.0.token", "a")
        .with("token.0.replacementType", "static")
        .with("token.0.replacement", "b")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    let names: Vec<_> = samples.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["web-1.log", "web-2.log"]);
    let first = only(&samples, "web-1.log");
    assert_eq!(
        first.file_path.as_deref(),
        Some(dir.path().join("samples/web-1.log").as_path())
    );
    assert_eq!(first.settings.text("spoolFile"), Some("web-1.log"));
    assert_eq!(only(&samples, "web-2.log").tokens.len(), 1);
}

#[test]
fn test_file_output_derives_file_name() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("web.log")
        .with("outputMode", "file")
        .with("spoolDir", "/var/spool")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].settings.text("fileName"), Some("/var/spool/web.log"));
}

#[test]
fn test_duplicate_stanza_keeps_first() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![
        stanza("web.log").with("count", "1"),
        stanza("web.log").with("count", "2"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].settings.int("count"), Some(1));
}

#[test]
fn test_unmatched_sample_kept_only_for_custom_generator() {
    let (_dir, mut config) = setup(&[]);
    let stanzas = vec![
        stanza("nothing.log"),
        stanza("synthetic").with("generator", "weblog"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].name, "synthetic");
    assert!(samples[0].file_path.is_none());
}

#[test]
fn test_disabled_stanza_is_dropped() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("web.log").with("disabled", "true")];

    assert!(resolve(&mut config, &stanzas).unwrap().is_empty());
}

#[test]
fn test_missing_app_aborts_resolution() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("other.log"), RawStanza::new("web.log")];

    let err = resolve(&mut config, &stanzas).unwrap_err();

    assert!(matches!(err, ResolveError::MissingApp { stanza } if stanza == "web.log"));
}

#[test]
fn test_global_stanza_sets_defaults_but_is_not_a_sample() {
    let (_dir, mut config) = setup(&["web.log", "global"]);
    let stanzas = vec![
        RawStanza::new("global").with("interval", "15"),
        stanza("web.log"),
    ];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].settings.int("interval"), Some(15));
    assert!(!samples[0].settings.is_explicit("interval"));
}

#[test]
fn test_invalid_setting_is_dropped_not_fatal() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("web.log")
        .with("interval", "often")
        .with("sampletype", "xml")
        .with("count", "4")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].settings.int("interval"), Some(60));
    assert_eq!(samples[0].sample_type(), "raw");
    assert_eq!(samples[0].settings.int("count"), Some(4));
}

#[test]
fn test_configured_sample_dir() {
    let dir = TempDir::new().unwrap();
    let elsewhere = dir.path().join("elsewhere");
    fs::create_dir(&elsewhere).unwrap();
    fs::write(elsewhere.join("x.log"), "x\n").unwrap();
    let mut config = Config::new(SearchPaths::new(dir.path(), "/nonexistent"));

    let stanzas = vec![stanza("x.log").with("sampleDir", elsewhere.to_str().unwrap())];
    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].file_path, Some(elsewhere.join("x.log")));
}

#[test]
fn test_file_output_with_custom_spool_file() {
    let (_dir, mut config) = setup(&["web.log"]);
    let stanzas = vec![stanza("web.log")
        .with("outputMode", "file")
        .with("spoolDir", "/var/spool")
        .with("spoolFile", "custom.out")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].settings.text("fileName"), Some("/var/spool/custom.out"));
    assert_eq!(samples[0].settings.text("spoolFile"), Some("custom.out"));
}

#[test]
fn test_samples_found_in_working_dir_when_config_root_has_none() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("conf");
    let work = dir.path().join("work");
    fs::create_dir(&root).unwrap();
    fs::create_dir_all(work.join("samples")).unwrap();
    fs::write(work.join("samples/web.log"), "x\n").unwrap();
    let mut config = Config::new(SearchPaths::new(root.clone(), work.clone()));

    let samples = resolve(&mut config, &[stanza("web.log")]).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].file_path, Some(work.join("samples/web.log")));
}

#[test]
fn test_samples_found_above_working_dir() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("conf");
    let work = dir.path().join("project/bin");
    fs::create_dir(&root).unwrap();
    fs::create_dir_all(&work).unwrap();
    fs::create_dir(dir.path().join("project/samples")).unwrap();
    fs::write(dir.path().join("project/samples/web.log"), "x\n").unwrap();
    let mut config = Config::new(SearchPaths::new(root.clone(), work.clone()));

    let samples = resolve(&mut config, &[stanza("web.log")]).unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(
        samples[0].file_path,
        Some(dir.path().join("project/samples/web.log"))
    );
}

#[test]
fn test_largest_token_index_resolves() {
    let (_dir, mut config) = setup(&["web.log"]);
    let last = usize::MAX;
    let stanzas = vec![stanza("web.log")
        .with(format!("token.{last}.token"), "a")
        .with(format!("token.{last}.replacementType"), "static")
        .with(format!("token.{last}.replacement"), "b")];

    let samples = resolve(&mut config, &stanzas).unwrap();

    assert_eq!(samples[0].tokens.len(), 1);
    assert_eq!(samples[0].tokens[0].pattern, "a");
}
