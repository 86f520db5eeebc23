use std::fs;

use s4_core::{classes, DiagnosticOptions};
use s4_schema::{load, load_str, Schema, SchemaError};

const GARAGE: &str = r#"
[[class]]
name = "Vehicle"

[[class]]
name = "Car"
contains = ["Vehicle"]

[[class]]
name = "Inspector"

[[class]]
name = "StateInspector"
contains = ["Inspector"]

[[union]]
name = "Inspectable"
members = ["Vehicle"]

[[generic]]
name = "inspect"
params = ["vehicle", "inspector"]

[[method]]
generic = "inspect"
signature = ["Vehicle", "Inspector"]
label = "vehicle"

[[method]]
generic = "inspect"
signature = ["Car", "Inspector"]
label = "car"
next = true

[[method]]
generic = "inspect"
signature = ["Inspectable", "ANY"]
"#;

#[test]
fn next_methods_chain_in_rank_order() {
    let d = load_str(GARAGE).unwrap();
    let out = d
        .dispatch("inspect", &classes(["Car", "StateInspector"]), &[])
        .unwrap();
    assert_eq!(out, "car > vehicle");
}

#[test]
fn union_methods_apply_to_members() {
    let d = load_str(GARAGE).unwrap();
    assert_eq!(d.distance("Car", "Inspectable"), Some(2));
    let out = d.dispatch("inspect", &classes(["Car", "Robot"]), &[]).unwrap();
    assert_eq!(out, "Inspectable#ANY");
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s4.toml");
    fs::write(&path, GARAGE).unwrap();

    let schema = Schema::from_file(&path).unwrap();
    assert_eq!(schema.methods.len(), 3);
    let d = load(&schema).unwrap();
    let names: Vec<String> = d
        .show_methods("inspect")
        .unwrap()
        .iter()
        .map(|m| m.render())
        .collect();
    assert_eq!(names, vec!["Car#Inspector", "Inspectable#ANY", "Vehicle#Inspector"]);
}

#[test]
fn cycle_is_reported_at_the_closing_entry() {
    let src = "[[class]]\nname = \"A\"\ncontains = [\"B\"]\n\n[[class]]\nname = \"B\"\ncontains = [\"A\"]\n";
    let err = load_str(src).unwrap_err();
    assert_eq!(err.code(), "D0001");
    let span = err.span().unwrap();
    assert_eq!(&src[span.clone()], "\"B\"");

    let out = err.render(src, "s4.toml", &DiagnosticOptions::colorless());
    assert!(out.contains("[D0001]"), "{}", out);
    assert!(out.contains("class `B` would be its own ancestor: B -> A -> B"), "{}", out);
    assert!(out.contains("parent links form a cycle"), "{}", out);
}

#[test]
fn arity_errors_point_at_the_signature() {
    let src = "[[generic]]\nname = \"f\"\nparams = [\"x\"]\n\n[[method]]\ngeneric = \"f\"\nsignature = [\"A\", \"B\"]\n";
    let err = load_str(src).unwrap_err();
    assert_eq!(err.code(), "D0006");
    assert_eq!(&src[err.span().unwrap()], "[\"A\", \"B\"]");
}

#[test]
fn reserved_names_are_rejected() {
    let err = load_str("[[class]]\nname = \"missing\"\n").unwrap_err();
    assert!(matches!(err, SchemaError::Dispatch { .. }));
    assert_eq!(err.code(), "D0003");
}

#[test]
fn parse_errors_carry_a_span() {
    let src = "[[class]]\nname = \n";
    let err = load_str(src).unwrap_err();
    assert_eq!(err.code(), "S0002");
    assert!(err.span().is_some());

    let json = err.diagnostic().to_json(err.span(), "s4.toml");
    assert_eq!(json["code"], "S0002");
    assert_eq!(json["severity"], "error");
}

#[test]
fn dispatch_table_configures_the_dispatcher() {
    let d = load_str("[dispatch]\ncache = false\nwarn-ambiguous = false\n").unwrap();
    assert!(!d.config().cache);
    assert!(!d.config().warn_ambiguous);
}
