//! Tests for the version layer: parsing, ordering, specifiers, and candidate
//! sets.

use semver::Version;

use crate::core::Dependency;
use crate::version::concrete::{ConcreteVersion, PinnedVersion};
use crate::version::specifier::{VersionSpecifier, intersect_all, intersection};
use crate::version::version_set::{ConcreteVersionSet, SpecifierDefinition};
use crate::version::{discard_build_metadata, has_same_numeric_components, parse_version};

fn ver(input: &str) -> Version {
    parse_version(input).unwrap()
}

fn spec(input: &str) -> VersionSpecifier {
    VersionSpecifier::parse(input).unwrap()
}

fn candidate(input: &str) -> ConcreteVersion {
    ConcreteVersion::new(input)
}

// ========== Version parsing ==========

#[test]
fn test_parse_version_accepts_tag_spellings() {
    assert_eq!(ver("1.2.3"), Version::new(1, 2, 3));
    assert_eq!(ver("v1.2.3"), Version::new(1, 2, 3));
    assert_eq!(ver("version-1.2.3"), Version::new(1, 2, 3));
    assert_eq!(ver(" 1.2.3 "), Version::new(1, 2, 3));
}

#[test]
fn test_parse_version_defaults_missing_patch() {
    assert_eq!(ver("1.2"), Version::new(1, 2, 0));
    assert_eq!(ver("v10.20"), Version::new(10, 20, 0));
    assert_eq!(ver("2.1-beta.1"), ver("2.1.0-beta.1"));
    assert_eq!(ver("2.1+build.5"), ver("2.1.0+build.5"));
}

#[test]
fn test_parse_version_keeps_pre_release_and_build() {
    let version = ver("1.2.3-beta.1+build.42");
    assert_eq!(version.major, 1);
    assert_eq!(version.pre.as_str(), "beta.1");
    assert_eq!(version.build.as_str(), "build.42");
}

#[test]
fn test_parse_version_rejects_non_versions() {
    assert!(parse_version("main").is_err());
    assert!(parse_version("abc123def").is_err());
    assert!(parse_version("1").is_err());
    assert!(parse_version("").is_err());
}

#[test]
fn test_parse_version_rejects_malformed_identifiers() {
    // Leading zero in a numeric pre-release identifier
    assert!(parse_version("1.0.0-01").is_err());
    // Empty pre-release identifier
    assert!(parse_version("1.0.0-").is_err());
    assert!(parse_version("1.0.0-alpha..1").is_err());
    // Identifier characters outside [A-Za-z0-9-]
    assert!(parse_version("1.0.0-be_ta").is_err());
    // Leading zero in a numeric component
    assert!(parse_version("1.01.0").is_err());
}

#[test]
fn test_semver_ordering() {
    // The canonical SemVer 2.0.0 precedence chain
    let chain = [
        "1.0.0-alpha",
        "1.0.0-alpha.1",
        "1.0.0-alpha.beta",
        "1.0.0-beta",
        "1.0.0-beta.2",
        "1.0.0-beta.11",
        "1.0.0-rc.1",
        "1.0.0",
        "1.0.1",
        "1.1.0",
        "2.0.0",
    ];
    for window in chain.windows(2) {
        let (lower, higher) = (ver(window[0]), ver(window[1]));
        assert!(
            lower.cmp_precedence(&higher).is_lt(),
            "{} should precede {}",
            window[0],
            window[1]
        );
    }
}

#[test]
fn test_build_metadata_does_not_affect_precedence() {
    let plain = ver("1.0.0");
    let built = ver("1.0.0+exp.sha.5114f85");
    assert!(plain.cmp_precedence(&built).is_eq());
    assert_eq!(discard_build_metadata(&built), plain);
}

#[test]
fn test_same_numeric_components() {
    assert!(has_same_numeric_components(&ver("1.2.3-alpha"), &ver("1.2.3")));
    assert!(!has_same_numeric_components(&ver("1.2.3"), &ver("1.2.4")));
}

// ========== Concrete versions ==========

#[test]
fn test_concrete_version_classification() {
    assert!(candidate("1.2.3").semantic().is_some());
    assert!(candidate("v1.2.3").semantic().is_some());
    assert!(candidate("develop").semantic().is_none());
    assert!(candidate("8a5f2c1").semantic().is_none());
    assert!(candidate("1.0.0-rc.1").is_pre_release());
    assert!(!candidate("1.0.0").is_pre_release());

    assert_eq!(PinnedVersion::new("v2.1.0").semantic(), Some(Version::new(2, 1, 0)));
    assert_eq!(PinnedVersion::new("develop").semantic(), None);
}

#[test]
fn test_concrete_version_preference_order() {
    // Higher semantic versions come first
    assert!(candidate("2.0.0") < candidate("1.9.9"));
    // Semantic candidates come before opaque ones
    assert!(candidate("0.0.1") < candidate("develop"));
    // Opaque candidates order by commit-ish
    assert!(candidate("develop") < candidate("main"));
    // Pre-release precedes its release in preference? No: release is higher
    assert!(candidate("1.0.0") < candidate("1.0.0-rc.1"));
}

#[test]
fn test_concrete_version_equality_ignores_spelling() {
    assert_eq!(candidate("1.0.0"), candidate("v1.0.0"));
    assert_ne!(candidate("1.0.0"), candidate("1.0.1"));
    assert_ne!(candidate("develop"), candidate("main"));
}

// ========== Specifier parsing and display ==========

#[test]
fn test_specifier_parse() {
    assert!(matches!(spec(""), VersionSpecifier::Any));
    assert!(matches!(spec("~> 1.0"), VersionSpecifier::CompatibleWith(_)));
    assert!(matches!(spec(">= 1.2.3"), VersionSpecifier::AtLeast(_)));
    assert!(matches!(spec("== 1.0"), VersionSpecifier::Exactly(_)));
    assert!(matches!(spec("1.2.3"), VersionSpecifier::Exactly(_)));
    assert!(matches!(spec("v2.0.0"), VersionSpecifier::Exactly(_)));
    assert!(matches!(spec("main"), VersionSpecifier::GitReference(_)));
    // A tag with a version buried inside is still an opaque reference
    assert!(matches!(spec("release-2.0"), VersionSpecifier::GitReference(_)));
    assert_eq!(spec("\"feature/login\""), VersionSpecifier::GitReference("feature/login".into()));
}

#[test]
fn test_specifier_parse_rejects_bad_operands() {
    assert!(VersionSpecifier::parse("~> nope").is_err());
    assert!(VersionSpecifier::parse(">= ").is_err());
}

#[test]
fn test_specifier_display_round_trip() {
    for input in ["~> 1.2.0", ">= 1.2.3", "== 1.0.0", "\"develop\""] {
        let parsed = spec(input);
        assert_eq!(spec(&parsed.to_string()), parsed);
    }
}

#[test]
fn test_specifier_precedence_order() {
    let ordered = [spec(""), spec(">= 1.0"), spec("~> 1.0"), spec("== 1.0"), spec("main")];
    for window in ordered.windows(2) {
        assert!(window[0].precedence() < window[1].precedence());
    }
}

// ========== Satisfaction ==========

#[test]
fn test_any_excludes_pre_releases() {
    assert!(spec("").is_satisfied_by(&candidate("1.0.0")));
    assert!(!spec("").is_satisfied_by(&candidate("1.0.1-beta.1")));
}

#[test]
fn test_opaque_pins_satisfy_version_requirements() {
    for requirement in ["", ">= 9.0.0", "~> 2.0", "== 3.1.4", "main"] {
        assert!(
            spec(requirement).is_satisfied_by(&candidate("8a5f2c1")),
            "opaque pin should satisfy {requirement:?}"
        );
    }
}

#[test]
fn test_at_least_satisfaction() {
    let at_least = spec(">= 1.1.0");
    assert!(at_least.is_satisfied_by(&candidate("1.1.0")));
    assert!(at_least.is_satisfied_by(&candidate("2.5.0")));
    assert!(!at_least.is_satisfied_by(&candidate("1.0.9")));
    // Pre-releases above the floor still do not qualify
    assert!(!at_least.is_satisfied_by(&candidate("1.2.0-beta.1")));
}

#[test]
fn test_pre_release_gating_requires_same_triple() {
    let targeted = spec(">= 1.2.0-alpha.2");
    assert!(targeted.is_satisfied_by(&candidate("1.2.0-beta.1")));
    assert!(targeted.is_satisfied_by(&candidate("1.2.0")));
    assert!(!targeted.is_satisfied_by(&candidate("1.2.0-alpha.1")));
    // Different numeric triple, even though it is above the floor
    assert!(!targeted.is_satisfied_by(&candidate("1.3.0-beta.1")));
}

#[test]
fn test_compatible_with_satisfaction() {
    let compatible = spec("~> 1.2.0");
    assert!(compatible.is_satisfied_by(&candidate("1.2.0")));
    assert!(compatible.is_satisfied_by(&candidate("1.9.9")));
    assert!(!compatible.is_satisfied_by(&candidate("2.0.0")));
    assert!(!compatible.is_satisfied_by(&candidate("1.1.9")));

    // In the 0.x regime the window is one minor line
    let zero = spec("~> 0.2.0");
    assert!(zero.is_satisfied_by(&candidate("0.2.5")));
    assert!(!zero.is_satisfied_by(&candidate("0.3.0")));
}

#[test]
fn test_exactly_ignores_build_metadata() {
    let exact = spec("== 1.2.3");
    assert!(exact.is_satisfied_by(&candidate("1.2.3")));
    assert!(exact.is_satisfied_by(&candidate("1.2.3+nightly.1")));
    assert!(!exact.is_satisfied_by(&candidate("1.2.4")));
}

// ========== Intersection algebra ==========

#[test]
fn test_intersection_any_is_identity() {
    let any = VersionSpecifier::Any;
    assert_eq!(intersection(&any, &any), Some(VersionSpecifier::Any));
    assert_eq!(intersection(&any, &spec(">= 1.0")), Some(spec(">= 1.0")));
    assert_eq!(intersection(&spec("~> 2.1"), &any), Some(spec("~> 2.1")));
    // The surviving side loses its build metadata
    assert_eq!(
        intersection(&any, &VersionSpecifier::AtLeast(ver("1.0.0+build.9"))),
        Some(spec(">= 1.0.0"))
    );
}

#[test]
fn test_intersection_at_least_pairs() {
    assert_eq!(intersection(&spec(">= 1.0"), &spec(">= 1.2")), Some(spec(">= 1.2")));
    assert_eq!(intersection(&spec(">= 2.1"), &spec(">= 1.2")), Some(spec(">= 2.1")));
}

#[test]
fn test_intersection_at_least_with_compatible() {
    // Floor below the compatibility window tightens to the window
    assert_eq!(intersection(&spec(">= 1.1"), &spec("~> 1.0")), Some(spec("~> 1.1")));
    assert_eq!(intersection(&spec("~> 1.0"), &spec(">= 1.1")), Some(spec("~> 1.1")));
    // Floor in a lower major line keeps the window
    assert_eq!(intersection(&spec(">= 0.9"), &spec("~> 1.2")), Some(spec("~> 1.2")));
    // Floor above the window's major line is disjoint
    assert_eq!(intersection(&spec(">= 2.0"), &spec("~> 1.2")), None);

    // 0.x: the window is one minor line, so a floor above it is disjoint
    assert_eq!(intersection(&spec(">= 0.5"), &spec("~> 0.2.0")), None);
    assert_eq!(intersection(&spec("~> 0.2.0"), &spec(">= 0.5")), None);
    // A floor inside or below the line still tightens it
    assert_eq!(intersection(&spec(">= 0.2.4"), &spec("~> 0.2.0")), Some(spec("~> 0.2.4")));
    assert_eq!(intersection(&spec(">= 0.1"), &spec("~> 0.2.0")), Some(spec("~> 0.2.0")));
}

#[test]
fn test_intersection_compatible_pairs() {
    assert_eq!(intersection(&spec("~> 1.1"), &spec("~> 1.4")), Some(spec("~> 1.4")));
    assert_eq!(intersection(&spec("~> 1.1"), &spec("~> 2.0")), None);
    // 0.x: differing minor lines are disjoint, same line tightens
    assert_eq!(intersection(&spec("~> 0.2.1"), &spec("~> 0.3.0")), None);
    assert_eq!(intersection(&spec("~> 0.2.1"), &spec("~> 0.2.4")), Some(spec("~> 0.2.4")));
}

#[test]
fn test_intersection_exactly_with_ranges() {
    assert_eq!(intersection(&spec("== 1.5.0"), &spec("~> 1.0")), Some(spec("== 1.5.0")));
    assert_eq!(intersection(&spec("~> 1.0"), &spec("== 2.0.0")), None);
    assert_eq!(intersection(&spec("== 1.5.0"), &spec(">= 1.6")), None);
    assert_eq!(intersection(&spec("== 1.5.0"), &spec("== 1.5.0")), Some(spec("== 1.5.0")));
    assert_eq!(intersection(&spec("== 1.5.0"), &spec("== 1.5.1")), None);
}

#[test]
fn test_intersection_git_references() {
    let develop = spec("develop");
    let main = spec("main");
    assert_eq!(intersection(&develop, &develop.clone()), Some(develop.clone()));
    assert_eq!(intersection(&develop, &main), None);
    // A reference absorbs version requirements
    assert_eq!(intersection(&develop, &spec(">= 1.0")), Some(develop.clone()));
    assert_eq!(intersection(&spec("~> 2.0"), &develop), Some(develop));
}

#[test]
fn test_intersect_all() {
    let specifiers = [spec(">= 1.1"), spec("~> 1.0"), spec("== 1.5.0")];
    assert_eq!(intersect_all(&specifiers), Some(spec("== 1.5.0")));

    let disjoint = [spec(">= 1.1"), spec("~> 1.0"), spec("== 2.0.0")];
    assert_eq!(intersect_all(&disjoint), None);

    let none: [VersionSpecifier; 0] = [];
    assert_eq!(intersect_all(&none), Some(VersionSpecifier::Any));
}

#[test]
fn test_intersection_agrees_with_satisfaction() {
    // For non-pre-release requirements, a version satisfies both specifiers
    // exactly when it satisfies the intersection - across the 0.x regime
    // included.
    let specifiers = [
        spec(""),
        spec(">= 0.2.4"),
        spec(">= 0.3.1"),
        spec(">= 1.1.0"),
        spec(">= 2.0.0"),
        spec("~> 0.2.0"),
        spec("~> 0.3.1"),
        spec("~> 1.0"),
        spec("~> 1.2.1"),
        spec("== 0.2.5"),
        spec("== 1.3.0"),
        spec("== 2.0.0"),
    ];
    let candidates = [
        candidate("0.1.0"),
        candidate("0.2.0"),
        candidate("0.2.4"),
        candidate("0.2.5"),
        candidate("0.2.9"),
        candidate("0.3.0"),
        candidate("0.3.5"),
        candidate("0.5.5"),
        candidate("1.0.0"),
        candidate("1.1.0"),
        candidate("1.2.1"),
        candidate("1.2.5"),
        candidate("1.3.0"),
        candidate("2.0.0"),
        candidate("2.5.0"),
        candidate("3.0.0-beta.1"),
    ];
    for a in &specifiers {
        for b in &specifiers {
            let combined = intersection(a, b);
            for version in &candidates {
                let both = a.is_satisfied_by(version) && b.is_satisfied_by(version);
                let through_intersection =
                    combined.as_ref().is_some_and(|c| c.is_satisfied_by(version));
                assert_eq!(
                    both, through_intersection,
                    "{a} ∩ {b} disagrees on {version}"
                );
            }
        }
    }
}

// ========== Candidate sets ==========

fn set_of(pins: &[&str]) -> ConcreteVersionSet {
    let mut set = ConcreteVersionSet::new();
    for pin in pins {
        set.insert(ConcreteVersion::new(*pin));
    }
    set
}

fn pins(set: &ConcreteVersionSet) -> Vec<String> {
    set.iter().map(|v| v.pinned().as_str().to_string()).collect()
}

#[test]
fn test_set_iteration_order() {
    let set = set_of(&["develop", "1.0.0", "2.1.0-alpha.1", "abc123", "2.0.0", "1.0.1-beta.1"]);
    assert_eq!(
        pins(&set),
        ["2.0.0", "1.0.0", "2.1.0-alpha.1", "1.0.1-beta.1", "abc123", "develop"]
    );
    assert_eq!(set.first().unwrap().pinned().as_str(), "2.0.0");
}

#[test]
fn test_set_insert_deduplicates_by_precedence() {
    let mut set = set_of(&["1.0.0"]);
    assert!(!set.insert(ConcreteVersion::new("v1.0.0")));
    assert_eq!(set.len(), 1);
    assert!(set.insert(ConcreteVersion::new("1.0.1")));
    assert_eq!(set.len(), 2);
}

#[test]
fn test_set_remove() {
    let mut set = set_of(&["1.0.0", "2.0.0", "develop"]);
    assert!(set.remove(&PinnedVersion::new("2.0.0")));
    assert!(!set.remove(&PinnedVersion::new("2.0.0")));
    assert!(set.remove(&PinnedVersion::new("develop")));
    assert_eq!(pins(&set), ["1.0.0"]);
}

#[test]
fn test_set_remove_all_except() {
    let mut set = set_of(&["1.0.0", "2.0.0", "1.5.0-rc.1", "develop"]);
    set.remove_all_except(&ConcreteVersion::new("1.5.0-rc.1"));
    assert_eq!(pins(&set), ["1.5.0-rc.1"]);
    assert_eq!(set.len(), 1);
}

#[test]
fn test_retention_matches_satisfaction() {
    let pins_under_test = [
        "3.0.0",
        "2.0.0",
        "1.2.0",
        "1.0.0",
        "1.0.1-beta.1",
        "2.1.0-alpha.1",
        "develop",
        "abc123",
    ];
    for requirement in ["", "~> 1.0", ">= 2.0", "== 1.2.0", ">= 1.0.1-beta.1"] {
        let specifier = spec(requirement);
        let mut set = set_of(&pins_under_test);
        set.retain_versions_compatible_with(&specifier);
        let full = set_of(&pins_under_test);
        let expected: Vec<String> = full
            .iter()
            .filter(|v| specifier.is_satisfied_by(v))
            .map(|v| v.pinned().as_str().to_string())
            .collect();
        assert_eq!(pins(&set), expected, "retention disagrees for {requirement:?}");

        // Retention is idempotent
        let before = pins(&set);
        set.retain_versions_compatible_with(&specifier);
        assert_eq!(pins(&set), before);
    }
}

#[test]
fn test_retention_reports_emptiness() {
    let mut set = set_of(&["1.0.0", "1.1.0"]);
    assert!(set.retain_versions_compatible_with(&spec("~> 1.0")));
    assert!(!set.retain_versions_compatible_with(&spec(">= 2.0")));
    assert!(set.is_empty());
}

#[test]
fn test_retention_git_reference_is_noop() {
    let mut set = set_of(&["2.0.0", "1.0.0-rc.1", "develop"]);
    assert!(set.retain_versions_compatible_with(&spec("main")));
    assert_eq!(set.len(), 3);
}

#[test]
fn test_definitions_and_conflicts() {
    let mut set = set_of(&["1.0.0"]);
    let from_root = SpecifierDefinition::root(spec("~> 1.0"));
    let from_parent =
        SpecifierDefinition::imposed_by(Dependency::hosted("alice", "http"), spec(">= 1.0"));
    set.add_definition(from_root.clone());
    set.add_definition(from_parent.clone());
    assert_eq!(set.definitions().len(), 2);

    // == 2.0.0 is disjoint with ~> 1.0 but not with >= 1.0
    let conflicting = set.conflicting_definition(&spec("== 2.0.0")).unwrap();
    assert_eq!(conflicting, &from_root);
    // ~> 1.2 intersects both recorded requirements
    assert!(set.conflicting_definition(&spec("~> 1.2")).is_none());
}

#[test]
fn test_definition_display() {
    let root = SpecifierDefinition::root(spec("~> 1.0"));
    assert_eq!(root.to_string(), "~> 1.0.0 (root requirement)");
    let imposed =
        SpecifierDefinition::imposed_by(Dependency::hosted("alice", "http"), spec("== 1.0.0"));
    assert_eq!(imposed.to_string(), "== 1.0.0 (required by alice/http)");
}
